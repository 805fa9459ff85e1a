use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use fantune_core::latest_sample;

// Synthetic serial backlog: mostly telemetry, some boot chatter and torn lines
fn synth_backlog(n: usize, seed: u32) -> Vec<String> {
    let mut state = seed.max(1);
    let mut next = || {
        let mut x = state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        state = x;
        x
    };
    (0..n)
        .map(|_| {
            let r = next();
            match r % 10 {
                0 => "fan: pid reset".to_string(),
                1 => format!("{:x} {:x}", r >> 8, r >> 16),
                _ => format!("{:x} {:x} {:x} {:x}", r % 7000, (r >> 3) % 7000, r % 101, r >> 24),
            }
        })
        .collect()
}

pub fn bench_latest_sample(c: &mut Criterion) {
    let mut g = c.benchmark_group("latest_sample");
    //   BENCH_SAMPLE_SIZE=10 BENCH_MEAS_MS=50 cargo bench -p fantune_core --bench decoder
    if let Ok(ss) = std::env::var("BENCH_SAMPLE_SIZE") {
        if let Ok(n) = ss.parse::<usize>() {
            g.sample_size(n.max(1));
        }
    } else {
        g.sample_size(50);
    }
    if let Ok(ms) = std::env::var("BENCH_MEAS_MS")
        && let Ok(ms_u64) = ms.parse::<u64>()
    {
        g.measurement_time(std::time::Duration::from_millis(ms_u64));
    }

    // one tick's drain at the default cap, and a long stalled-reader backlog
    for &n in &[16usize, 256, 4096] {
        let lines = synth_backlog(n, 0xC0FFEE);
        g.bench_function(format!("lines_{n}"), |b| {
            b.iter_batched(
                || lines.clone(),
                |l| {
                    black_box(latest_sample(black_box(&l)));
                },
                BatchSize::SmallInput,
            )
        });
    }
    g.finish();
}

criterion_group!(decoder, bench_latest_sample);
criterion_main!(decoder);
