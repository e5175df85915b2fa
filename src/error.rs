//! Crate-level error type.

use thiserror::Error;

use crate::{
    config::ConfigError, control::router::RouteError, engine::EngineError, graph::GraphError,
    graph::granular::PlayerError, io::wav::LoadError,
};

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Player(#[from] PlayerError),

    #[error(transparent)]
    Route(#[from] RouteError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Load(#[from] LoadError),
}

pub type Result<T> = core::result::Result<T, Error>;
