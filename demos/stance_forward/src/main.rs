// Stance forward-pass demo
//
// Builds a seeded model, allocates one graph builder, and scores a couple
// of hand-written examples in evaluation mode. The token ids stand in for
// a real vocabulary; producing them is a preprocessing concern.
//
// Architecture: lookup(8) -> BiLSTM(8 -> 2x16) -> concat -> max pool -> Linear(32 -> 3)

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use stancer::{Feature, Graph, GraphBuilder, HyperParams, ModelParams};

const VOCAB_SIZE: usize = 100;

fn main() -> stancer::Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    let opts = HyperParams {
        word_dim: 8,
        hidden_size: 16,
        label_size: 3,
        dropout: 0.0,
        max_sentence_length: 64,
    };
    let params = Arc::new(ModelParams::new(
        VOCAB_SIZE,
        &opts,
        &mut StdRng::seed_from_u64(1234),
    )?);

    let mut builder = GraphBuilder::new();
    builder.create_nodes(opts.max_sentence_length)?;
    builder.initialize(&params, &opts)?;

    println!("=== stancer: forward-pass demo ===");
    println!(
        "word_dim={}, hidden_size={}, labels={}, pool={} positions",
        opts.word_dim,
        opts.hidden_size,
        opts.label_size,
        builder.capacity()
    );
    println!();

    let examples = [
        Feature::new(vec![5], vec![7, 9]),
        Feature::new(vec![12, 3], vec![40, 41, 42, 43, 44]),
        Feature::new(vec![71, 72, 73], vec![2, 8, 21]),
    ];

    let mut graph = Graph::new();
    for (n, feature) in examples.iter().enumerate() {
        graph.reset();
        let scores = builder.forward(&mut graph, feature, false)?;
        println!(
            "example {}: target={:?} context={:?}",
            n, feature.target_tokens, feature.context_tokens
        );
        println!(
            "  scores = {:?}  ({} graph steps recorded)",
            scores.data(),
            graph.len()
        );
    }

    Ok(())
}
