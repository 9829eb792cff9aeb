use std::path::PathBuf;

use draft_insights::tree::load_tree_model;

fn main() -> anyhow::Result<()> {
    let _ = dotenvy::from_filename(".env");
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("SCORING_MODEL_PATH").ok())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("tests/fixtures/tree_model.json"));

    let model = load_tree_model(&path)?;
    println!("model      {} v{}", model.model_type, model.version);
    println!("layout     {:?}", model.layout);
    println!(
        "shape      depth {} ({} reported), {} leaves ({} reported)",
        model.root().depth(),
        model.max_depth,
        model.root().leaf_count(),
        model.n_leaves
    );
    println!(
        "metrics    MAE {:.3}  RMSE {:.3}  R2 {:.3}  within 2pts {:.1}%",
        model.metrics.mae,
        model.metrics.rmse,
        model.metrics.r2,
        model.metrics.within_2
    );
    println!("features   {} declared", model.features.len());
    let unknown = model.unknown_features();
    if !unknown.is_empty() {
        println!("unknown    {}", unknown.join(", "));
    }
    Ok(())
}
