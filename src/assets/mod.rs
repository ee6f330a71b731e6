//! # Asset Intake
//!
//! Accepts input clips and the optional BGM track, rejects duplicates and
//! unsupported files, and splits videos into lead and body clips by filename.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use splice_compositor::assets::{AssetLibrary, AssetLoader};
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let mut library = AssetLibrary::default();
//! library.add_video(AssetLoader::load("キャッチ_A.mp4").await?)?;
//! library.add_video(AssetLoader::load("ボディ_A.mp4").await?)?;
//!
//! println!("{} outputs queued", library.pair_count());
//! # Ok(())
//! # }
//! ```

pub mod classifier;
pub mod loader;
pub mod types;

pub use classifier::{AddReport, AssetClassifier, AssetLibrary};
pub use loader::AssetLoader;
pub use types::{AssetCandidate, AssetRole, MediaAsset};
