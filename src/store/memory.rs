/// In-memory seed backend for tests and ephemeral deployments.
use std::collections::BTreeMap;

use anyhow::Result;

use super::SeedBackend;

#[derive(Default)]
pub struct MemoryBackend {
    seeds: BTreeMap<String, Vec<u8>>,
}

impl MemoryBackend {
    pub fn new() -> MemoryBackend {
        MemoryBackend::default()
    }

    pub fn len(&self) -> usize {
        self.seeds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seeds.is_empty()
    }
}

impl SeedBackend for MemoryBackend {
    fn get_raw(&mut self, name: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.seeds.get(name).cloned())
    }

    fn put_raw(&mut self, name: &str, bytes: &[u8]) -> Result<()> {
        self.seeds.insert(name.to_string(), bytes.to_vec());
        Ok(())
    }

    fn remove(&mut self, name: &str) -> Result<()> {
        self.seeds.remove(name);
        Ok(())
    }

    fn begin(&mut self) -> Result<()> {
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}
