// Integration tests for the stance graph builder
//
// Black-box coverage of the builder lifecycle, the length clamp, and
// end-to-end determinism with seeded parameters. White-box wiring checks
// (position remapping, concat alignment) live next to the builder itself.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use stancer::{Error, Feature, Graph, GraphBuilder, HyperParams, ModelParams, MAX_SENTENCE_LENGTH};

fn opts(word_dim: usize, hidden: usize, labels: usize) -> HyperParams {
    HyperParams {
        word_dim,
        hidden_size: hidden,
        label_size: labels,
        dropout: 0.0,
        max_sentence_length: MAX_SENTENCE_LENGTH,
    }
}

fn seeded_params(vocab: usize, opts: &HyperParams, seed: u64) -> Arc<ModelParams> {
    Arc::new(ModelParams::new(vocab, opts, &mut StdRng::seed_from_u64(seed)).unwrap())
}

// Lifecycle

#[test]
fn forward_before_create_nodes_fails() {
    let mut builder = GraphBuilder::new();
    let mut g = Graph::new();
    let feature = Feature::new(vec![1], vec![2]);
    assert!(matches!(
        builder.forward(&mut g, &feature, false),
        Err(Error::InvalidState { .. })
    ));
}

#[test]
fn forward_before_initialize_fails() {
    let mut builder = GraphBuilder::new();
    builder.create_nodes(8).unwrap();
    let mut g = Graph::new();
    let feature = Feature::new(vec![1], vec![2]);
    assert!(matches!(
        builder.forward(&mut g, &feature, false),
        Err(Error::InvalidState { .. })
    ));
}

#[test]
fn forward_after_clear_fails() {
    let opts = opts(4, 3, 2);
    let params = seeded_params(16, &opts, 1);
    let mut builder = GraphBuilder::new();
    builder.create_nodes(8).unwrap();
    builder.initialize(&params, &opts).unwrap();
    builder.clear();

    let mut g = Graph::new();
    let feature = Feature::new(vec![1], vec![2]);
    assert!(matches!(
        builder.forward(&mut g, &feature, false),
        Err(Error::InvalidState { .. })
    ));
}

#[test]
fn create_nodes_rejects_zero_capacity() {
    let mut builder = GraphBuilder::new();
    assert!(matches!(
        builder.create_nodes(0),
        Err(Error::InvalidCapacity { got: 0 })
    ));
}

#[test]
fn create_nodes_clamps_to_ceiling() {
    let mut builder = GraphBuilder::new();
    builder.create_nodes(5000).unwrap();
    assert_eq!(builder.capacity(), MAX_SENTENCE_LENGTH);
}

#[test]
fn clear_then_rebuild_works() {
    let opts = opts(4, 3, 2);
    let params = seeded_params(16, &opts, 2);
    let mut builder = GraphBuilder::new();
    builder.create_nodes(8).unwrap();
    builder.initialize(&params, &opts).unwrap();
    builder.clear();
    assert_eq!(builder.capacity(), 0);

    builder.create_nodes(8).unwrap();
    builder.initialize(&params, &opts).unwrap();
    let mut g = Graph::new();
    let scores = builder
        .forward(&mut g, &Feature::new(vec![1], vec![2]), false)
        .unwrap();
    assert_eq!(scores.elem_count(), 2);
}

// Resize behavior

#[test]
fn repeated_create_nodes_is_idempotent() {
    let opts = opts(4, 3, 2);
    let params = seeded_params(16, &opts, 3);
    let feature = Feature::new(vec![5], vec![7, 9]);

    let mut builder = GraphBuilder::new();
    builder.create_nodes(8).unwrap();
    builder.create_nodes(8).unwrap();
    builder.initialize(&params, &opts).unwrap();
    let mut g = Graph::new();
    let first = builder.forward(&mut g, &feature, false).unwrap();

    builder.create_nodes(8).unwrap();
    let second = builder.forward(&mut g, &feature, false).unwrap();
    assert_eq!(first.data(), second.data());
}

// End-to-end

#[test]
fn small_example_is_deterministic() {
    let opts = opts(6, 4, 3);
    let feature = Feature::new(vec![5], vec![7, 9]);

    let mut outputs = Vec::new();
    for _ in 0..2 {
        let params = seeded_params(16, &opts, 42);
        let mut builder = GraphBuilder::new();
        builder.create_nodes(MAX_SENTENCE_LENGTH).unwrap();
        builder.initialize(&params, &opts).unwrap();
        let mut g = Graph::new();
        let scores = builder.forward(&mut g, &feature, false).unwrap();
        assert_eq!(scores.elem_count(), 3);

        // Three active positions: one lookup, one left step, one right
        // step, and one concat each, plus pooling and projection.
        assert_eq!(g.len(), 4 * 3 + 2);
        outputs.push(scores);
    }
    assert_eq!(outputs[0].data(), outputs[1].data());
}

#[test]
fn pool_reuse_after_longer_example_does_not_leak() {
    // Trailing slots left over from a longer example must not affect a
    // shorter one: outputs match a fresh builder that only ever saw the
    // short example.
    let opts = opts(6, 4, 3);
    let short = Feature::new(vec![5], vec![7, 9]);
    let long = Feature::new(vec![1, 2, 3], vec![4, 5, 6, 7, 8]);

    let params = seeded_params(16, &opts, 42);
    let mut reused = GraphBuilder::new();
    reused.create_nodes(16).unwrap();
    reused.initialize(&params, &opts).unwrap();
    let mut g = Graph::new();
    reused.forward(&mut g, &long, false).unwrap();
    let after_reuse = reused.forward(&mut g, &short, false).unwrap();

    let params = seeded_params(16, &opts, 42);
    let mut fresh = GraphBuilder::new();
    fresh.create_nodes(16).unwrap();
    fresh.initialize(&params, &opts).unwrap();
    let fresh_scores = fresh.forward(&mut g, &short, false).unwrap();

    assert_eq!(after_reuse.data(), fresh_scores.data());
}

#[test]
fn initialize_again_rebinds_everything() {
    let opts = opts(6, 4, 3);
    let feature = Feature::new(vec![5], vec![7, 9]);

    let first = seeded_params(16, &opts, 1);
    let second = seeded_params(16, &opts, 2);

    let mut rebound = GraphBuilder::new();
    rebound.create_nodes(8).unwrap();
    rebound.initialize(&first, &opts).unwrap();
    rebound.initialize(&second, &opts).unwrap();
    let mut g = Graph::new();
    let rebound_scores = rebound.forward(&mut g, &feature, false).unwrap();

    let mut direct = GraphBuilder::new();
    direct.create_nodes(8).unwrap();
    direct.initialize(&second, &opts).unwrap();
    let direct_scores = direct.forward(&mut g, &feature, false).unwrap();

    assert_eq!(rebound_scores.data(), direct_scores.data());
}

#[test]
fn initialize_rejects_mismatched_bundle() {
    let opts_a = opts(6, 4, 3);
    let params = seeded_params(16, &opts_a, 1);
    let mut opts_b = opts_a.clone();
    opts_b.hidden_size = 8;

    let mut builder = GraphBuilder::new();
    builder.create_nodes(8).unwrap();
    assert!(builder.initialize(&params, &opts_b).is_err());
}

// Length clamp

#[test]
fn overlong_input_truncates_instead_of_failing() {
    let opts = opts(3, 2, 2);
    let params = seeded_params(1200, &opts, 9);
    let mut builder = GraphBuilder::new();
    builder.create_nodes(MAX_SENTENCE_LENGTH).unwrap();
    builder.initialize(&params, &opts).unwrap();

    // 1000 target + 100 context tokens: exactly 24 context tokens fit.
    // Every context token past index 23 is far outside the vocabulary, so
    // the call only succeeds if the dropped tail is never looked up.
    let target: Vec<u32> = (0..1000).map(|i| (i % 1000) as u32).collect();
    let mut context: Vec<u32> = (0..24).map(|i| 1000 + i as u32).collect();
    context.extend(std::iter::repeat(1_000_000).take(76));

    let mut g = Graph::new();
    let scores = builder
        .forward(&mut g, &Feature::new(target, context), false)
        .unwrap();
    assert_eq!(scores.elem_count(), 2);
    assert_eq!(g.len(), 4 * MAX_SENTENCE_LENGTH + 2);
}

#[test]
fn in_range_positions_still_reject_unknown_tokens() {
    let opts = opts(3, 2, 2);
    let params = seeded_params(10, &opts, 9);
    let mut builder = GraphBuilder::new();
    builder.create_nodes(8).unwrap();
    builder.initialize(&params, &opts).unwrap();

    let mut g = Graph::new();
    let r = builder.forward(&mut g, &Feature::new(vec![1], vec![99]), false);
    assert!(matches!(r, Err(Error::TokenOutOfRange { token: 99, .. })));
}
