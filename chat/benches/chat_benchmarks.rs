//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Benchmarks for chat framing

use bytes::BytesMut;
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use std::io::Cursor;
use tokio_util::codec::Decoder;
use vimoir_chat::{ChatCodec, ChatSink, Encoding, Framer};

struct Count(usize);

impl ChatSink for Count {
    fn collect_incoming_data(&mut self, _data: &str) {}

    fn found_terminator(&mut self) {
        self.0 += 1;
    }
}

fn event_stream(lines: usize) -> Vec<u8> {
    (0..lines)
        .map(|i| format!("{}:keyAtPos={} \"C-K\" {}/{}\n", i % 8, i, i * 3, i % 80))
        .collect::<String>()
        .into_bytes()
}

fn bench_decode_lines(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_lines");

    for lines in [10, 100, 1000].iter() {
        let data = event_stream(*lines);
        group.throughput(Throughput::Bytes(data.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(lines), &data, |b, data| {
            b.iter(|| {
                let mut codec = ChatCodec::default();
                let mut buffer = BytesMut::from(&data[..]);
                let mut frames = 0;
                while let Some(frame) = codec.decode(&mut buffer).unwrap() {
                    black_box(frame);
                    frames += 1;
                }
                frames
            });
        });
    }

    group.finish();
}

fn bench_framer_read(c: &mut Criterion) {
    let mut group = c.benchmark_group("framer_read");
    let data = event_stream(1000);
    group.throughput(Throughput::Bytes(data.len() as u64));

    group.bench_function("utf8", |b| {
        b.iter(|| {
            let mut framer = Framer::new(Encoding::Utf8);
            framer.set_terminator(Some("\n"));
            let mut sink = Count(0);
            let mut reader = Cursor::new(black_box(&data[..]));
            framer.on_readable(&mut reader, &mut sink).unwrap();
            sink.0
        });
    });

    group.finish();
}

fn bench_framer_write(c: &mut Criterion) {
    let mut group = c.benchmark_group("framer_write");

    group.bench_function("commands", |b| {
        b.iter(|| {
            let mut framer = Framer::new(Encoding::Utf8);
            for seqno in 0..100 {
                framer
                    .send(&format!("1:showBalloon!{seqno} \"hello\"\n"))
                    .unwrap();
            }
            let mut out = Vec::with_capacity(4096);
            framer.on_writable(&mut out).unwrap();
            out.len()
        });
    });

    group.finish();
}

criterion_group!(benches, bench_decode_lines, bench_framer_read, bench_framer_write);
criterion_main!(benches);
