//! Sources of the five property layers.

use std::collections::BTreeMap;

use super::{PropertyError, PropertyResult};
use crate::model::{Action, JobDescriptor};

/// Read access to the property maps of every layer.
///
/// An absent key means the property is not defined at that layer.
pub trait PropertyStore {
    fn system_properties(&self) -> BTreeMap<String, String>;

    fn job_properties(&self, job_id: i64) -> PropertyResult<BTreeMap<String, String>>;

    fn algorithm_properties(&self, job_id: i64, algorithm: &str) -> PropertyResult<BTreeMap<String, String>>;

    fn media_properties(&self, media_id: i64) -> PropertyResult<BTreeMap<String, String>>;

    fn action_properties(&self, action: &Action) -> BTreeMap<String, String> {
        action.properties.clone()
    }
}

/// Property store backed by a single job description and the system defaults.
#[derive(Debug, Clone)]
pub struct JobPropertyStore<'a> {
    job: &'a JobDescriptor,
    system: BTreeMap<String, String>,
}

impl<'a> JobPropertyStore<'a> {
    pub fn new(job: &'a JobDescriptor, system: BTreeMap<String, String>) -> Self {
        Self { job, system }
    }

    fn check_job(&self, job_id: i64) -> PropertyResult<()> {
        if job_id == self.job.id {
            Ok(())
        } else {
            Err(PropertyError::UnknownJob(job_id))
        }
    }
}

impl PropertyStore for JobPropertyStore<'_> {
    fn system_properties(&self) -> BTreeMap<String, String> {
        self.system.clone()
    }

    fn job_properties(&self, job_id: i64) -> PropertyResult<BTreeMap<String, String>> {
        self.check_job(job_id)?;
        Ok(self.job.job_properties.clone())
    }

    fn algorithm_properties(&self, job_id: i64, algorithm: &str) -> PropertyResult<BTreeMap<String, String>> {
        self.check_job(job_id)?;
        Ok(self
            .job
            .algorithm_properties
            .get(algorithm)
            .cloned()
            .unwrap_or_default())
    }

    fn media_properties(&self, media_id: i64) -> PropertyResult<BTreeMap<String, String>> {
        self.job
            .media(media_id)
            .map(|media| media.media_properties.clone())
            .ok_or(PropertyError::UnknownMedia(media_id))
    }
}
