pub mod error;
pub mod extract;
pub mod routes;

pub type DeploymentImpl = local_deployment::LocalDeployment;

pub use routes::router as build_router;
