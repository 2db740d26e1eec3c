pub(crate) mod changelog;
pub(crate) mod committers;
pub(crate) mod contributors;
pub(crate) mod hackfest;
pub(crate) mod limits;
pub(crate) mod new_contributors;
pub(crate) mod shared;
