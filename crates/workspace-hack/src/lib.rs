//! Empty crate that exists to unify features across the workspace.
