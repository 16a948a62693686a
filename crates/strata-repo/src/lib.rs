//! High-level repository API for Strata.
//!
//! [`Repository`] wires the object store, ref store, conflict store, and
//! configuration together and exposes the everyday workflow: init, commit,
//! branch, checkout, tag, merge, resolve, and history. Every lower-level
//! component receives its collaborators explicitly, so this crate is the only
//! place the concrete backends are chosen.
//!
//! ```
//! use strata_repo::{CommitProposal, Repository};
//! use strata_store::{Feature, Node, ObjectStore, RevObject, Value};
//!
//! let mut repo = Repository::init()?;
//! repo.config_mut().set_identity("Alice", "alice@example.com");
//!
//! let feature = Feature::new(strata_types::ObjectId::NULL, vec![Value::Int(1)]);
//! let id = repo.store().put(&RevObject::Feature(feature))?;
//! repo.commit(
//!     CommitProposal::new("add p1")
//!         .put("points/p1", Node::feature("p1", id, strata_types::ObjectId::NULL)),
//! )?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod commit;
pub mod config;
pub mod error;
pub mod repository;

pub use commit::CommitProposal;
pub use config::{Config, USER_EMAIL, USER_NAME};
pub use error::{RepoError, Result};
pub use repository::{Repository, DEFAULT_BRANCH};
