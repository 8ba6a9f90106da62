use wp_api_types::Wave;

/// Waves in arrival order: the last bulk fetch, then every pushed event.
///
/// No sorting and no deduplication. `revision` increases on every mutation
/// so a renderer can tell when to redraw.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WaveFeedStore {
    waves: Vec<Wave>,
    revision: u64,
}

impl WaveFeedStore {
    pub fn replace_all(&mut self, waves: Vec<Wave>) {
        self.waves = waves;
        self.revision += 1;
    }

    pub fn append(&mut self, wave: Wave) {
        self.waves.push(wave);
        self.revision += 1;
    }

    pub fn waves(&self) -> &[Wave] {
        &self.waves
    }

    pub fn len(&self) -> usize {
        self.waves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waves.is_empty()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }
}
