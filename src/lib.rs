/// Stratus - declarative cloud stacks for Pulumi
///
/// Declares an HTTP API backed by a serverless function and a GPU-enabled
/// Kubernetes cluster for model training, renders them as Pulumi YAML programs
/// and drives the pulumi CLI to apply them. The function's handler bodies live
/// here too so the `bootstrap` runtime binary and the CLI share them.
pub mod aws;
pub mod config;
pub mod engine;
pub mod error;
pub mod gcp;
pub mod handler;
pub mod k8s;
pub mod render;
pub mod resource;
pub mod scenario;
pub mod serve;
pub mod smoke;
pub mod utils;
