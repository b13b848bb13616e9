//! sortbox - inbox sorting utility
//!
//! This library classifies the entries of an inbox directory through a
//! registry of competing classifiers, moves each file into its category
//! folder and runs the category's follow-up action. Configuration comes from
//! TOML files and the environment.

pub mod action;
pub mod classifier;
pub mod cli;
pub mod config;
pub mod file_organizer;
pub mod inspector;
pub mod output;
pub mod pipeline;
pub mod process;
pub mod registry;

pub use action::{Action, ActionStatus, NoAction, OpenWithAction};
pub use classifier::{Category, ClassificationResult, Classifier};
pub use config::{ConfigError, ExcludeFilter, SortConfig};
pub use file_organizer::{CollisionPolicy, FileOrganizer, OrganizeError};
pub use inspector::{ContentInspector, FileCommandInspector, InferInspector};
pub use pipeline::{FileOutcome, Pipeline, PipelineError, RunReport};
pub use registry::{ClassifierRegistry, RegistryError, standard_registry};

pub use cli::{Cli, run_cli};
