//! Facilities, agents and deployments

mod entity;

pub use entity::{Agent, Deployment, Facility};
