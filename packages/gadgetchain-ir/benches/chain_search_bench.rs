//! Summary engine and chain search throughput
//!
//! Synthetic programs: `n` serializable gadgets, each forwarding a field
//! through `depth` wrapper methods into `Runtime.exec`.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use gadgetchain_ir::features::program::domain::{JavaType, MethodRef};
use gadgetchain_ir::features::program::{ClassBuilder, ClassDecl, MethodBuilder};
use gadgetchain_ir::{AnalysisOptions, GadgetChainPipeline, Preset, Program, RuleLoader};

const RUNTIME: &str = "java.lang.Runtime";
const STRING: &str = "java.lang.String";

// ============================================================================
// Fixtures
// ============================================================================

fn wrapper_ref(class: &str, k: usize) -> MethodRef {
    MethodRef::new(class, format!("w{}", k), vec![JavaType::string()], JavaType::void())
}

fn gadget(i: usize, depth: usize) -> ClassDecl {
    let name = format!("bench.Gadget{}", i);
    let mut class = ClassBuilder::new(name.as_str())
        .implements("java.io.Serializable")
        .field("rt", RUNTIME)
        .field("cmd", STRING);

    let mut read = MethodBuilder::new("readObject");
    let this = read.this_var(name.as_str());
    read.param("in", "java.io.ObjectInputStream");
    let cmd = read.local("cmd", STRING);
    read.load_field(cmd, this, name.as_str(), "cmd");
    read.invoke_virtual(None, this, wrapper_ref(&name, 0), &[cmd]);
    read.ret(None);
    class = class.method(read.build());

    for k in 0..depth {
        let mut w = MethodBuilder::new(format!("w{}", k));
        let this = w.this_var(name.as_str());
        let p = w.param("p", STRING);
        if k + 1 < depth {
            w.invoke_virtual(None, this, wrapper_ref(&name, k + 1), &[p]);
        } else {
            let rt = w.local("rt", RUNTIME);
            w.load_field(rt, this, name.as_str(), "rt");
            w.invoke_virtual(
                None,
                rt,
                MethodRef::new(RUNTIME, "exec", vec![JavaType::string()], JavaType::void()),
                &[p],
            );
        }
        w.ret(None);
        class = class.method(w.build());
    }
    class.build()
}

fn program(n: usize, depth: usize) -> Program {
    let runtime = ClassBuilder::new(RUNTIME)
        .method(MethodBuilder::new("exec").param_type(STRING).native_().build())
        .build();
    let mut classes = vec![runtime];
    classes.extend((0..n).map(|i| gadget(i, depth)));
    Program::new(classes).expect("synthetic program is well-formed")
}

const RULES: &str = r#"
sources:
  - method: Serializable
sinks:
  - method: "<java.lang.Runtime: void exec(java.lang.String)>"
    index: [0]
"#;

// ============================================================================
// Benchmarks
// ============================================================================

fn bench_pipeline_by_gadgets(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline_by_gadgets");
    let pipeline = GadgetChainPipeline::new(AnalysisOptions::preset(Preset::Balanced)).unwrap();

    for n in [10, 50, 200] {
        let program = program(n, 3);
        let rules = RuleLoader::new(&program, true).load_str(RULES).unwrap();
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| black_box(pipeline.run(&program, &rules).report.total()));
        });
    }

    group.finish();
}

fn bench_pipeline_by_depth(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline_by_depth");
    let pipeline = GadgetChainPipeline::new(AnalysisOptions::preset(Preset::Thorough)).unwrap();

    for depth in [2, 6, 10] {
        let program = program(20, depth);
        let rules = RuleLoader::new(&program, true).load_str(RULES).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, _| {
            b.iter(|| black_box(pipeline.run(&program, &rules).report.total()));
        });
    }

    group.finish();
}

fn bench_rule_loading(c: &mut Criterion) {
    let program = program(200, 3);
    c.bench_function("rule_loading", |b| {
        b.iter(|| black_box(RuleLoader::new(&program, true).load_str(RULES).unwrap().stats.sources));
    });
}

criterion_group!(benches, bench_pipeline_by_gadgets, bench_pipeline_by_depth, bench_rule_loading);
criterion_main!(benches);
