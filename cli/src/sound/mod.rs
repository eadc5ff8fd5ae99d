pub mod asset;
pub mod player;
pub mod store;

pub use asset::SoundAsset;
#[allow(unused_imports)]
pub use player::PlaybackError;
pub use player::{PulsePlayer, RodioPlayer};
pub use store::SoundStore;
#[allow(unused_imports)]
pub use store::SoundStoreError;
