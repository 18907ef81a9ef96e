use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use minipb::value::Value;
use minipb::{decode, encode, Schema};

/// Schema: id (unsigned varint), name (string), repeated phone numbers each
/// a nested `{number: string, kind: unsigned}` message.
fn person_schema() -> Schema {
    Schema::compile_format_string("VU+[UV]").unwrap()
}

fn person_value(num_phones: usize) -> Value {
    let phones: Vec<Value> = (0..num_phones)
        .map(|i| {
            Value::Message(vec![
                Value::String(format!("555-{i:04}")),
                Value::Unsigned((i % 3) as u64),
            ])
        })
        .collect();
    Value::Message(vec![
        Value::Unsigned(12345),
        Value::String("Alice Johnson".to_owned()),
        Value::List(phones),
    ])
}

fn encode_benchmark(c: &mut Criterion) {
    let schema = person_schema();
    let mut group = c.benchmark_group("schema_encode");

    for num_phones in [0usize, 1, 10, 100] {
        let value = person_value(num_phones);
        let encoded_len = encode(&schema, &value).unwrap().len();
        group.throughput(Throughput::Bytes(encoded_len as u64));

        group.bench_with_input(
            BenchmarkId::new("minipb", num_phones),
            &value,
            |b, value| b.iter(|| std::hint::black_box(encode(&schema, value).unwrap())),
        );
    }
    group.finish();
}

fn decode_benchmark(c: &mut Criterion) {
    let schema = person_schema();
    let mut group = c.benchmark_group("schema_decode");

    for num_phones in [0usize, 1, 10, 100] {
        let value = person_value(num_phones);
        let encoded = encode(&schema, &value).unwrap();
        group.throughput(Throughput::Bytes(encoded.len() as u64));

        group.bench_with_input(
            BenchmarkId::new("minipb", num_phones),
            &encoded,
            |b, bytes| b.iter(|| std::hint::black_box(decode(&schema, bytes).unwrap())),
        );
    }
    group.finish();
}

fn raw_breakdown_benchmark(c: &mut Criterion) {
    let schema = person_schema();
    let encoded = encode(&schema, &person_value(100)).unwrap();

    c.bench_function("raw_breakdown_100_phones", |b| {
        b.iter(|| {
            let records: Vec<_> = minipb::raw::breakdown(&encoded).collect::<Result<_, _>>().unwrap();
            std::hint::black_box(records)
        })
    });
}

criterion_group!(benches, encode_benchmark, decode_benchmark, raw_breakdown_benchmark);
criterion_main!(benches);
