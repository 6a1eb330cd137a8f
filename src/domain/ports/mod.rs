//! Ports to the vision model and persistent storage.

mod response_store_port;
mod vision_model_port;

#[cfg(test)]
pub use response_store_port::MockResponseStorePort;
pub use response_store_port::ResponseStorePort;
pub use vision_model_port::{ModelResponse, VisionModelPort, VisionRequest};

#[cfg(test)]
pub mod mocks {
    pub use super::vision_model_port::mock::MockVisionModel;
}
