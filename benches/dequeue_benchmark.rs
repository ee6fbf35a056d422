use criterion::{black_box, criterion_group, criterion_main, Criterion};

use codel::fifo::{Config, Fifo, Packet};
use codel::params::Parameters;

const MS: u64 = 1_000_000;

fn criterion_benchmark(c: &mut Criterion) {
    c.bench_function("dequeue healthy queue", |b| {
        b.iter(|| drain(black_box(0)))
    });

    c.bench_function("dequeue standing queue", |b| {
        b.iter(|| drain(black_box(20 * MS)))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);

struct TestPacket {
    size: u32,
}

impl Packet for TestPacket {
    fn size(&self) -> u32 {
        self.size
    }
}

// Pushes and pops packets through a queue where each packet waits `delay`.
fn drain(delay: u64) -> u64 {
    let mut fifo = Fifo::new(Config::default(), Parameters::default());
    let mut now = 0;
    for _ in 0..1000 {
        fifo.enqueue_at(TestPacket { size: 1500 }, now).unwrap();
    }
    while fifo.dequeue_at(now + delay, false).is_some() {
        fifo.enqueue_at(TestPacket { size: 1500 }, now).ok();
        now += MS / 10;
        if now > 2000 * MS {
            break;
        }
    }
    fifo.stats().dropped
}
