use acc2tax::accession::{AccessionResolver, Convergence, SeekLines, SliceLines};
use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;
use std::io::Cursor;

fn sorted_accessions(count: usize) -> (Vec<u8>, Vec<String>) {
    let mut data = String::new();
    let mut keys = Vec::with_capacity(count);
    for i in 0..count {
        let key = format!("NZ_{:08}", i * 7);
        data.push_str(&format!("{}\t{}.1\t{}\t{}\n", key, key, 1000 + i % 5000, i));
        keys.push(key);
    }
    (data.into_bytes(), keys)
}

fn criterion_benchmark(c: &mut Criterion) {
    let (data, keys) = sorted_accessions(200_000);
    let probe: Vec<&String> = keys.iter().step_by(997).collect();

    c.bench_function("slice_threshold", |b| {
        let mut resolver = AccessionResolver::new(SliceLines::new(&data), Convergence::default());
        b.iter(|| {
            for key in &probe {
                black_box(resolver.find(key).unwrap());
            }
        })
    });

    c.bench_function("slice_exact", |b| {
        let mut resolver = AccessionResolver::new(SliceLines::new(&data), Convergence::Exact);
        b.iter(|| {
            for key in &probe {
                black_box(resolver.find(key).unwrap());
            }
        })
    });

    c.bench_function("seek_exact", |b| {
        let source = SeekLines::new(Cursor::new(data.clone())).unwrap();
        let mut resolver = AccessionResolver::new(source, Convergence::Exact);
        b.iter(|| {
            for key in &probe {
                black_box(resolver.find(key).unwrap());
            }
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
