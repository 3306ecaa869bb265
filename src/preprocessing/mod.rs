//! Feature preprocessing module
//!
//! Provides the feature codec shared by training and inference:
//! - Categorical label encoding (sorted classes, strict lookup)
//! - Standard scaling of numeric features
//! - An immutable codec state fitted once on the training partition

mod codec;
mod encoder;
mod scaler;

pub use codec::{CodecState, FeatureCodec};
pub use encoder::{CategoryEncoder, CategoryEncoders};
pub use scaler::{ScalerParams, StandardScaler};
