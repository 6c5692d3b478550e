use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use stream_checker::{
    aggregate, host_of, normalize, AggregationPolicy, Config, ProbeResult, Protocol,
};
use std::time::Duration;

// Fast settings for all benchmarks
fn configure_fast_group(group: &mut criterion::BenchmarkGroup<criterion::measurement::WallTime>) {
    group.warm_up_time(Duration::from_millis(500));
    group.measurement_time(Duration::from_millis(500));
    group.sample_size(20);
}

/// Playlist text with alternates, annotations and duplicates, like a real subscription.
fn playlist_lines(channels: usize) -> Vec<String> {
    let mut lines = vec!["News,#genre#".to_string()];
    for i in 0..channels {
        lines.push(format!(
            "CH{i},http://cdn{}.example.com/live/{i}.m3u8#rtmp://origin.example.com/live/{i}$1080p",
            i % 7
        ));
        if i % 3 == 0 {
            lines.push(format!("CH{i} HD,http://cdn{}.example.com/live/{i}.m3u8$720p", i % 7));
        }
    }
    lines
}

fn probe_results(count: usize) -> Vec<ProbeResult> {
    (0..count)
        .map(|i| {
            let url = format!("http://h{}.example.com/{i}", i % 13);
            ProbeResult {
                name: format!("CH{}", i % 50),
                protocol: Protocol::from_url(&url),
                url,
                reachable: i % 4 != 0,
                elapsed_ms: Some(((i * 37) % 1000) as f64),
                resolution: None,
                error: None,
            }
        })
        .collect()
}

fn benchmark_config_creation(c: &mut Criterion) {
    let mut group = c.benchmark_group("config");
    configure_fast_group(&mut group);

    group.bench_function("creation", |b| {
        b.iter(|| {
            let config = Config::default();
            black_box(config);
        });
    });

    group.finish();
}

fn benchmark_normalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalize");
    configure_fast_group(&mut group);

    for channels in [100, 1_000, 10_000] {
        let lines = playlist_lines(channels);
        group.bench_with_input(BenchmarkId::from_parameter(channels), &lines, |b, lines| {
            b.iter(|| black_box(normalize(black_box(lines))));
        });
    }

    group.finish();
}

fn benchmark_aggregate(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregate");
    configure_fast_group(&mut group);

    let policy = AggregationPolicy {
        save_failed: true,
        keep_per_name: Some(3),
        max_results: Some(500),
    };

    for count in [1_000, 10_000] {
        let results = probe_results(count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &results, |b, results| {
            b.iter(|| black_box(aggregate(results.clone(), &policy)));
        });
    }

    group.finish();
}

fn benchmark_protocol_and_host(c: &mut Criterion) {
    let mut group = c.benchmark_group("url_classification");
    configure_fast_group(&mut group);

    let urls = [
        "http://example.com/live.m3u8",
        "rtmp://origin.example.com:1935/live/stream",
        "rtp://239.0.0.1:5000",
        "p3p://peer.example.com:8000/ch/1",
        "foo://bar",
    ];

    group.bench_function("protocol_from_url", |b| {
        b.iter(|| {
            for url in &urls {
                black_box(Protocol::from_url(url));
            }
        });
    });

    group.bench_function("host_of", |b| {
        b.iter(|| {
            for url in &urls {
                black_box(host_of(url));
            }
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_config_creation,
    benchmark_normalize,
    benchmark_aggregate,
    benchmark_protocol_and_host
);
criterion_main!(benches);
