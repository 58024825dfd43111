use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use pixel_windows::core::{AlphaHandling, Framebuffer};
use pixel_windows::{Rgba, WindowManager};

const SIZES: [(u32, u32); 3] = [(64, 64), (640, 480), (1920, 1080)];

fn bench_clear(c: &mut Criterion) {
    let mut group = c.benchmark_group("clear");
    for (width, height) in SIZES {
        let mut fb = Framebuffer::new(width, height);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}x{}", width, height)),
            &(width, height),
            |b, _| b.iter(|| fb.clear_rgba(black_box(Rgba::new(12, 34, 56, 255)))),
        );
    }
    group.finish();
}

fn bench_set_pixel(c: &mut Criterion) {
    let mut fb = Framebuffer::new(640, 480);
    c.bench_function("set_pixel_full_frame_640x480", |b| {
        b.iter(|| {
            for y in 0..480 {
                for x in 0..640 {
                    fb.set_pixel(black_box(x), black_box(y), x as u8, y as u8, 0);
                }
            }
        })
    });
}

fn bench_compose(c: &mut Criterion) {
    let mut group = c.benchmark_group("compose_1920x1080");
    let mut fb = Framebuffer::transparent(1920, 1080);
    fb.clear_rgba(Rgba::new(200, 100, 50, 128));
    for handling in [
        AlphaHandling::Straight,
        AlphaHandling::Opaque,
        AlphaHandling::Premultiplied,
    ] {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{:?}", handling)),
            &handling,
            |b, &handling| b.iter(|| black_box(fb.compose(handling))),
        );
    }
    group.finish();
}

fn bench_command_throughput(c: &mut Criterion) {
    let manager = WindowManager::headless();
    manager.start().expect("headless start");
    let id = manager.create_window(256, 256, "bench").expect("bench window");

    c.bench_function("queued_frame_256x256", |b| {
        b.iter(|| {
            manager.clear_black(id);
            for i in 0..256 {
                manager.set_pixel(id, i, i, 255, 0, 0);
            }
            manager.present(id);
            manager.flush().expect("flush");
        })
    });
}

criterion_group!(
    benches,
    bench_clear,
    bench_set_pixel,
    bench_compose,
    bench_command_throughput
);
criterion_main!(benches);
