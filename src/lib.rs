pub mod collector;
pub mod config;
pub mod domain;
pub mod github;
pub mod proto_convert;
pub mod scheduler;
pub mod service;
pub mod staleness;
pub mod store;

pub mod proto {
    tonic::include_proto!("dashwatch");
}
