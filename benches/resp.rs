use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use redis_wire::cmd::Command;
use redis_wire::decoder::ResponseDecoder;
use redis_wire::queue::ByteQueue;
use redis_wire::resp::encode_command;

fn bench_resp(c: &mut Criterion) {
    let mut group = c.benchmark_group("resp");

    group.bench_function("decode_1k_replies", |b| {
        let mut frame = Vec::new();
        for i in 0..1000 {
            frame.extend_from_slice(
                format!("${}\r\nval{}\r\n", 3 + i.to_string().len(), i).as_bytes(),
            );
        }
        let frame = Bytes::from(frame);
        b.iter(|| {
            let mut queue = ByteQueue::new();
            queue.push(frame.clone());
            let mut decoder = ResponseDecoder::new();
            let mut decoded = 0;
            while let Some(reply) = decoder.try_decode(&mut queue).unwrap() {
                black_box(&reply);
                decoded += 1;
            }
            assert_eq!(decoded, 1000);
        });
    });

    group.bench_function("encode_1k_commands", |b| {
        let commands: Vec<Command> = (0..1000)
            .map(|i| {
                Command::set(
                    Bytes::from(format!("key{i}")),
                    Bytes::from(format!("val{i}")),
                )
            })
            .collect();
        let mut buf = vec![0u8; 64 * 1024];
        b.iter(|| {
            let mut at = 0;
            for command in &commands {
                at = encode_command(&mut buf, at, command).unwrap();
            }
            black_box(at);
        });
    });

    group.finish();
}

criterion_group!(benches, bench_resp);
criterion_main!(benches);
