use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use hub_core::{
    PreprocessConfig, TUMOR_INPUT_SIZE, TokenSequence, Vocabulary, preprocess_dynamic_image,
};
use hub_utils::config::ResizeQuality;
use image::{DynamicImage, ImageBuffer, Rgb};

fn synthetic_scan(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(ImageBuffer::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    }))
}

fn preprocess_configs() -> Vec<(&'static str, PreprocessConfig)> {
    vec![
        (
            "quality",
            PreprocessConfig {
                input_size: TUMOR_INPUT_SIZE,
                resize_quality: ResizeQuality::Quality,
            },
        ),
        (
            "speed",
            PreprocessConfig {
                input_size: TUMOR_INPUT_SIZE,
                resize_quality: ResizeQuality::Speed,
            },
        ),
    ]
}

fn benchmark_image_preprocessing(c: &mut Criterion) {
    let images = [
        ("512x512", synthetic_scan(512, 512)),
        ("1920x1080", synthetic_scan(1920, 1080)),
    ];
    let configs = preprocess_configs();

    let mut group = c.benchmark_group("preprocess_dynamic_image");
    for (size, image) in images.iter() {
        for (label, config) in configs.iter() {
            group.bench_with_input(
                BenchmarkId::new(*size, label),
                config,
                |b, cfg| {
                    b.iter(|| {
                        preprocess_dynamic_image(black_box(image), cfg)
                            .expect("preprocessing should succeed");
                    });
                },
            );
        }
    }
    group.finish();
}

fn benchmark_review_encoding(c: &mut Criterion) {
    let words = ["this", "movie", "was", "good", "bad", "plot", "acting", "the"];
    let vocabulary = Vocabulary::from_pairs(
        words
            .iter()
            .enumerate()
            .map(|(idx, word)| (*word, idx as u32 + 1)),
    );

    let mut group = c.benchmark_group("encode_review");
    for word_count in [20usize, 500, 2000] {
        let text = (0..word_count)
            .map(|i| words[i % words.len()])
            .collect::<Vec<_>>()
            .join(" ");
        group.bench_with_input(BenchmarkId::from_parameter(word_count), &text, |b, text| {
            b.iter(|| TokenSequence::encode(black_box(text), &vocabulary).to_model_input());
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    benchmark_image_preprocessing,
    benchmark_review_encoding
);
criterion_main!(benches);
