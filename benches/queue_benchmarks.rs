use async_trait::async_trait;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use bgremove_studio::{
    BatchProcessor, Exporter, PreviewRef, RemovalClient, RemovalRequest, SourceFile, StudioEvent,
    StudioState, StudioStore,
};
use std::sync::Arc;
use tokio::runtime::Runtime;

const PNG_HEADER: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
const QUEUE_SIZES: &[usize] = &[10, 100, 500];

/// Answers immediately so the benchmark measures queue bookkeeping only
struct InstantClient {
    result: PreviewRef,
}

#[async_trait]
impl RemovalClient for InstantClient {
    async fn remove_background(
        &self,
        _request: RemovalRequest,
    ) -> bgremove_studio::Result<PreviewRef> {
        Ok(self.result.clone())
    }

    fn endpoint(&self) -> &str {
        "instant://"
    }
}

fn sources(count: usize) -> Vec<SourceFile> {
    (0..count)
        .map(|i| {
            let mut bytes = PNG_HEADER.to_vec();
            bytes.resize(64 * 1024, 0);
            SourceFile::new(format!("image_{:04}.png", i), Some("image/png"), bytes)
        })
        .collect()
}

fn processed_state(count: usize) -> StudioState {
    let mut state = StudioState::new()
        .apply(&StudioEvent::Intake(sources(count)))
        .expect("intake");
    let result = PreviewRef::new(vec![0u8; 32 * 1024], "image/png");

    for id in state.ids() {
        state = state
            .apply(&StudioEvent::BeginProcessing(id))
            .and_then(|s| {
                s.apply(&StudioEvent::Completed {
                    id,
                    result: result.clone(),
                })
            })
            .expect("transition");
    }
    state
}

fn benchmark_reducer(c: &mut Criterion) {
    let mut group = c.benchmark_group("reducer");

    for &size in QUEUE_SIZES {
        let files = sources(size);
        group.bench_with_input(BenchmarkId::new("intake", size), &files, |b, files| {
            b.iter(|| {
                StudioState::new()
                    .apply(&StudioEvent::Intake(black_box(files.clone())))
                    .expect("intake")
            });
        });

        let state = processed_state(size);
        let last = *state.ids().last().expect("non-empty queue");
        group.bench_with_input(BenchmarkId::new("remove_last", size), &state, |b, state| {
            b.iter(|| state.apply(&StudioEvent::Remove(black_box(last))).expect("remove"));
        });
    }

    group.finish();
}

fn benchmark_batch_run(c: &mut Criterion) {
    let rt = Runtime::new().expect("runtime");
    let client: Arc<dyn RemovalClient> = Arc::new(InstantClient {
        result: PreviewRef::new(PNG_HEADER.to_vec(), "image/png"),
    });

    let mut group = c.benchmark_group("batch_run");
    group.sample_size(20);

    for &size in QUEUE_SIZES {
        group.bench_function(BenchmarkId::from_parameter(size), |b| {
            b.iter(|| {
                let store = Arc::new(StudioStore::default());
                store.intake(sources(size)).expect("intake");
                let processor = BatchProcessor::new(store, Arc::clone(&client));
                rt.block_on(async { black_box(processor.run_batch().await.expect("batch")) })
            });
        });
    }

    group.finish();
}

fn benchmark_export(c: &mut Criterion) {
    let exporter = Exporter::default();
    let mut group = c.benchmark_group("export_all");

    for &size in QUEUE_SIZES {
        let state = processed_state(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &state, |b, state| {
            b.iter(|| exporter.export_all(black_box(state)).expect("archive"));
        });
    }

    group.finish();
}

criterion_group!(
    queue_benches,
    benchmark_reducer,
    benchmark_batch_run,
    benchmark_export
);
criterion_main!(queue_benches);
