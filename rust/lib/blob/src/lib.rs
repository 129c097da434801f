pub mod assets;
pub mod error;
pub mod file;
pub mod traits;

pub use assets::{content_type_for, AssetStorage};
pub use error::BlobError;
pub use file::FileStore;
pub use traits::BlobStore;
