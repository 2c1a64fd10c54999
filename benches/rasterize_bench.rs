use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::time::Duration;
use vexel::*;

const STAR_BOXES: &str = r#"
    M50,0 21,90 98,35 2,35 79,90z
    M110,0 h90 v90 h-90z
    M130,20 h50 v50 h-50 z
    M210,0  h90 v90 h-90 z
    M230,20 v50 h50 v-50 z
"#;

fn curve_benchmark(c: &mut Criterion) {
    let cubic = Cubic::new((158.0, 70.0), (210.0, 250.0), (25.0, 190.0), (219.0, 89.0));
    let mut group = c.benchmark_group("cubic");
    group
        .throughput(Throughput::Elements(1))
        .bench_function("extremities", |b| b.iter(|| black_box(cubic).extremities()))
        .bench_function("bbox", |b| b.iter(|| black_box(cubic).bbox(None)))
        .bench_function("arc_length", |b| {
            b.iter(|| black_box(cubic).arc_length(1e-3))
        })
        .bench_function("closest", |b| {
            b.iter(|| black_box(cubic).closest(Point::new(100.0, 100.0)))
        })
        .bench_function("offset", |b| {
            b.iter_with_large_drop(|| {
                let mut out: Vec<Segment> = Vec::new();
                black_box(cubic).offset(10.0, &mut out);
                out
            })
        });
    group.finish();
}

fn shape_benchmark(c: &mut Criterion) {
    let shape: Shape = STAR_BOXES.parse().unwrap();
    let tr = Transform::identity();
    let style = StrokeStyle {
        width: 1.0,
        line_join: LineJoin::Round,
        line_cap: LineCap::Round,
    };

    let mut group = c.benchmark_group("shape");
    group
        .throughput(Throughput::Elements(shape.segments_count() as u64))
        .bench_function("parse", |b| {
            b.iter_with_large_drop(|| STAR_BOXES.parse::<Shape>())
        })
        .bench_function("flatten", |b| {
            b.iter(|| shape.flatten(tr, DEFAULT_FLATNESS, true).count())
        })
        .bench_function("stroke", |b| b.iter_with_large_drop(|| shape.stroke(style)))
        .bench_function("mask", |b| {
            b.iter_with_large_drop(|| shape.rasterize(tr, FillRule::EvenOdd))
        });
    group.finish();
}

fn context_benchmark(c: &mut Criterion) {
    let shape: Shape = STAR_BOXES.parse().unwrap();
    let rasterizer = SignedDifferenceRasterizer::default();
    let mut group = c.benchmark_group("context");
    group.throughput(Throughput::Elements(shape.segments_count() as u64));
    group.bench_with_input(
        BenchmarkId::new("fill", rasterizer.name()),
        &rasterizer,
        |b, _r| {
            b.iter(|| {
                let mut ctx = Context::new(300, 90);
                ctx.draw_shape(
                    &shape,
                    FillRule::NonZero,
                    LinColor::new(0.3, 0.5, 0.7, 1.0),
                );
                ctx
            })
        },
    );
    group.finish();
}

criterion_group!(
    name = rasterize;
    config = Criterion::default().sample_size(10).warm_up_time(Duration::new(1, 0));
    targets = curve_benchmark, shape_benchmark, context_benchmark
);
criterion_main!(rasterize);
