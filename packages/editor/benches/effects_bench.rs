use criterion::{black_box, criterion_group, criterion_main, Criterion};
use elemental_editor::{
    IdentityAssigner, InvalidPolicy, NodeSpec, NodeTree, NodeType, PostEffectEngine, ValidationConfig,
    VariableValidator,
};

fn template(blocks: usize) -> Vec<NodeSpec> {
    (0..blocks)
        .map(|i| {
            NodeSpec::paragraph(vec![
                NodeSpec::text(format!("Paragraph {} for ", i)),
                NodeSpec::variable(if i % 10 == 0 { "secret.token" } else { "user.firstName" }),
                NodeSpec::text("!"),
            ])
        })
        .collect()
}

fn engine(policy: InvalidPolicy) -> PostEffectEngine {
    PostEffectEngine::with_effects(
        IdentityAssigner::default(),
        VariableValidator::new(
            ValidationConfig::default()
                .with_validator(|name| name != "secret.token")
                .with_policy(policy),
        ),
    )
}

fn analyze_stamped_tree(c: &mut Criterion) {
    let engine = engine(InvalidPolicy::Mark);
    let mut tree = NodeTree::from_specs(&template(500));
    engine.run(&mut tree).unwrap();

    c.bench_function("analyze_stamped_500_blocks", |b| {
        b.iter(|| engine.analyze(black_box(&tree)))
    });
}

fn first_run_mark(c: &mut Criterion) {
    let engine = engine(InvalidPolicy::Mark);
    let specs = template(500);

    c.bench_function("first_run_mark_500_blocks", |b| {
        b.iter(|| {
            let mut tree = NodeTree::from_specs(black_box(&specs));
            engine.run(&mut tree).unwrap()
        })
    });
}

fn first_run_remove(c: &mut Criterion) {
    let engine = engine(InvalidPolicy::Remove);
    let specs = template(500);

    c.bench_function("first_run_remove_500_blocks", |b| {
        b.iter(|| {
            let mut tree = NodeTree::from_specs(black_box(&specs));
            engine.run(&mut tree).unwrap()
        })
    });
}

fn assign_ids_in_columns(c: &mut Criterion) {
    let assigner = IdentityAssigner::default();
    let specs: Vec<NodeSpec> = (0..50)
        .map(|_| {
            NodeSpec::new(NodeType::Columns).with_children(vec![
                NodeSpec::new(NodeType::Column).with_children(template(4)),
                NodeSpec::new(NodeType::Column).with_children(vec![NodeSpec::new(NodeType::Divider)]),
            ])
        })
        .collect();

    c.bench_function("assign_ids_50_column_rows", |b| {
        b.iter(|| {
            let mut tree = NodeTree::from_specs(black_box(&specs));
            assigner.assign(&mut tree).unwrap()
        })
    });
}

criterion_group!(
    benches,
    analyze_stamped_tree,
    first_run_mark,
    first_run_remove,
    assign_ids_in_columns
);
criterion_main!(benches);
