use std::sync::Arc;

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use redlilium_framegraph::{
    DummyDevice, Format, FrameGraph, FrameGraphConfig, NativeResource, ResourceInfo, Usage,
};

fn new_graph() -> (Arc<DummyDevice>, FrameGraph) {
    let device = Arc::new(DummyDevice::new());
    let graph = FrameGraph::with_device(device.clone(), FrameGraphConfig::default());
    (device, graph)
}

fn target() -> ResourceInfo {
    ResourceInfo::tex2d(1920, 1080, Format::Rgba16Float)
}

/// `passes` graphics passes, each sampling the previous one's target.
fn declare_chain(graph: &mut FrameGraph, passes: usize) {
    let swap = graph.import_with_final(
        "swapchain",
        ResourceInfo::tex2d(1920, 1080, Format::Bgra8Unorm),
        Usage::ColorTarget,
        Usage::Present,
        NativeResource::from_raw(u64::MAX),
    );
    let mut pass = graph.graphics("pass_0");
    let mut prev = pass.create(target(), "target_0", Usage::ColorTarget).handle();
    for i in 1..passes {
        let mut pass = graph.graphics(&format!("pass_{i}"));
        pass.read(prev, "input", Usage::PixelShaderRead);
        prev = pass
            .create(target(), &format!("target_{i}"), Usage::ColorTarget)
            .handle();
    }
    let mut present = graph.graphics("present");
    present.read(prev, "input", Usage::PixelShaderRead);
    present.write(swap, "swapchain", Usage::ColorTarget);
}

/// Upload, then alternating async compute and graphics passes.
fn declare_mixed(graph: &mut FrameGraph, rounds: usize) {
    let swap = graph.import_with_final(
        "swapchain",
        ResourceInfo::tex2d(1920, 1080, Format::Bgra8Unorm),
        Usage::ColorTarget,
        Usage::Present,
        NativeResource::from_raw(u64::MAX),
    );
    let mut upload = graph.copy("upload");
    let constants = upload
        .create(ResourceInfo::array(256, 64), "constants", Usage::CopyDest)
        .handle();

    let mut gbuffer = graph.graphics("gbuffer");
    gbuffer.read(constants, "constants", Usage::VertexInput);
    let mut prev = gbuffer.create(target(), "gbuffer", Usage::ColorTarget).handle();

    for i in 0..rounds {
        let mut compute = graph.compute(&format!("compute_{i}"));
        compute.read(prev, "input", Usage::NonPixelShaderRead);
        let scratch = compute
            .create(target(), &format!("scratch_{i}"), Usage::UnorderedWrite)
            .handle();
        let mut gfx = graph.graphics(&format!("pass_{i}"));
        gfx.read(scratch, "scratch", Usage::PixelShaderRead);
        prev = gfx
            .create(target(), &format!("color_{i}"), Usage::ColorTarget)
            .handle();
    }

    let mut present = graph.graphics("present");
    present.read(prev, "input", Usage::PixelShaderRead);
    present.write(swap, "swapchain", Usage::ColorTarget);
}

// ---------------------------------------------------------------------------
// Declaration
// ---------------------------------------------------------------------------

fn bench_declare_chain(c: &mut Criterion) {
    c.bench_function("frame_graph_declare_32_passes_chain", |b| {
        let (_device, mut graph) = new_graph();
        b.iter(|| {
            declare_chain(&mut graph, 32);
            black_box(graph.passes().len());
            graph.reset().unwrap();
        });
    });
}

// ---------------------------------------------------------------------------
// Compilation
// ---------------------------------------------------------------------------

fn bench_compile_small(c: &mut Criterion) {
    c.bench_function("frame_graph_compile_4_passes", |b| {
        let (device, mut graph) = new_graph();
        declare_chain(&mut graph, 4);
        b.iter(|| {
            black_box(graph.compile().unwrap().len());
            device.clear_commands();
        });
    });
}

fn bench_compile_large(c: &mut Criterion) {
    c.bench_function("frame_graph_compile_32_passes_chain", |b| {
        let (device, mut graph) = new_graph();
        declare_chain(&mut graph, 32);
        b.iter(|| {
            black_box(graph.compile().unwrap().len());
            device.clear_commands();
        });
    });
}

fn bench_compile_mixed(c: &mut Criterion) {
    c.bench_function("frame_graph_compile_mixed_queues", |b| {
        let (device, mut graph) = new_graph();
        declare_mixed(&mut graph, 8);
        b.iter(|| {
            black_box(graph.compile().unwrap().sync_count());
            device.clear_commands();
        });
    });
}

// ---------------------------------------------------------------------------
// Execution
// ---------------------------------------------------------------------------

fn bench_execute_mixed(c: &mut Criterion) {
    c.bench_function("frame_graph_execute_mixed_queues", |b| {
        let (device, mut graph) = new_graph();
        declare_mixed(&mut graph, 8);
        graph.compile().unwrap();
        b.iter(|| {
            graph.execute().unwrap();
            device.clear_commands();
        });
    });
}

criterion_group!(
    benches,
    bench_declare_chain,
    bench_compile_small,
    bench_compile_large,
    bench_compile_mixed,
    bench_execute_mixed,
);
criterion_main!(benches);
