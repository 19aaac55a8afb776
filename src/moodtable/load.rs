//! Startup loading of the CSV mood/song table.

use super::song::{MoodBucket, SongRecord};
use crate::classifier::EmotionLabel;
use crate::error::PipelineError;
use rand::seq::IndexedRandom;
use rand::Rng;
use std::path::Path;
use tracing::{info, warn};

/// The full song table, loaded once and queried by mood bucket.
#[derive(Debug)]
pub struct MoodTable {
    songs: Vec<SongRecord>,
}

impl MoodTable {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<MoodTable, PipelineError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_path(path.as_ref())
            .map_err(|err| {
                PipelineError::ResourceUnavailable(format!(
                    "could not open mood table {}: {}",
                    path.as_ref().display(),
                    err
                ))
            })?;

        let headers = reader
            .headers()
            .map_err(|err| {
                PipelineError::ResourceUnavailable(format!("mood table has no header row: {}", err))
            })?
            .clone();

        let column = |name: &str| -> Result<usize, PipelineError> {
            headers
                .iter()
                .position(|h| h.eq_ignore_ascii_case(name))
                .ok_or_else(|| {
                    PipelineError::ResourceUnavailable(format!(
                        "mood table is missing required column {:?}",
                        name
                    ))
                })
        };
        let name_idx = column("name")?;
        let album_idx = column("album")?;
        let artist_idx = column("artist")?;
        let mood_idx = column("mood")?;

        let mut songs = Vec::new();
        for (row, record) in reader.records().enumerate() {
            let record = record.map_err(|err| {
                PipelineError::ResourceUnavailable(format!(
                    "mood table row {} is malformed: {}",
                    row + 1,
                    err
                ))
            })?;

            let raw_mood = record.get(mood_idx).unwrap_or("");
            let mood = match raw_mood.parse::<MoodBucket>() {
                Ok(mood) => mood,
                Err(_) => {
                    warn!("Skipping mood table row {}: unknown mood {:?}", row + 1, raw_mood);
                    continue;
                }
            };

            songs.push(SongRecord {
                id: songs.len(),
                name: record.get(name_idx).unwrap_or("").to_string(),
                album: record.get(album_idx).unwrap_or("").to_string(),
                artist: record.get(artist_idx).unwrap_or("").to_string(),
                mood,
            });
        }

        info!("Loaded {} songs from the mood table", songs.len());
        Ok(MoodTable { songs })
    }

    pub fn from_songs(songs: Vec<SongRecord>) -> MoodTable {
        MoodTable { songs }
    }

    pub fn len(&self) -> usize {
        self.songs.len()
    }

    pub fn bucket_songs(&self, bucket: MoodBucket) -> Vec<&SongRecord> {
        self.songs.iter().filter(|s| s.mood == bucket).collect()
    }

    /// Random sample of `n` distinct songs from the label's bucket. The RNG is
    /// passed in so callers can seed it.
    pub fn sample<R: Rng + ?Sized>(
        &self,
        label: EmotionLabel,
        n: usize,
        rng: &mut R,
    ) -> Result<Vec<SongRecord>, PipelineError> {
        let bucket = MoodBucket::for_label(label);
        let matching = self.bucket_songs(bucket);

        if matching.len() < n {
            return Err(PipelineError::InsufficientData {
                wanted: n,
                available: matching.len(),
            });
        }

        Ok(matching
            .choose_multiple(rng, n)
            .map(|song| (*song).clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;
    use std::io::Write;
    use tempfile::NamedTempFile;

    pub(crate) fn table_with(bucket: MoodBucket, count: usize) -> MoodTable {
        let songs = (0..count)
            .map(|i| SongRecord {
                id: i,
                name: format!("song-{}", i),
                album: format!("album-{}", i),
                artist: format!("artist-{}", i),
                mood: bucket,
            })
            .collect();
        MoodTable::from_songs(songs)
    }

    #[test]
    fn loads_csv_and_skips_unknown_moods() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "id,name,album,artist,mood").unwrap();
        writeln!(file, "1,Levitating,Future Nostalgia,Dua Lipa,energetic").unwrap();
        writeln!(file, "2,Weightless,Ambient,Marconi Union,Chill").unwrap();
        writeln!(file, "3,Mystery,Unknown,Nobody,saudade").unwrap();
        file.flush().unwrap();

        let table = MoodTable::load(file.path()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.bucket_songs(MoodBucket::Energetic).len(), 1);
        assert_eq!(table.bucket_songs(MoodBucket::Chill).len(), 1);
    }

    #[test]
    fn missing_required_column_is_resource_unavailable() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "id,name,album,artist").unwrap();
        writeln!(file, "1,a,b,c").unwrap();
        file.flush().unwrap();

        let err = MoodTable::load(file.path()).unwrap_err();
        assert!(matches!(err, PipelineError::ResourceUnavailable(_)));
    }

    #[test]
    fn missing_file_is_resource_unavailable() {
        let err = MoodTable::load("/no/such/musicData.csv").unwrap_err();
        assert!(matches!(err, PipelineError::ResourceUnavailable(_)));
    }

    #[test]
    fn samples_distinct_songs() {
        let table = table_with(MoodBucket::Energetic, 30);
        let mut rng = StdRng::seed_from_u64(7);

        let songs = table.sample(EmotionLabel::Happy, 10, &mut rng).unwrap();
        assert_eq!(songs.len(), 10);

        let ids: HashSet<usize> = songs.iter().map(|s| s.id).collect();
        assert_eq!(ids.len(), 10);
    }

    #[test]
    fn sampling_is_reproducible_with_same_seed() {
        let table = table_with(MoodBucket::Romantic, 25);

        let mut rng_a = StdRng::seed_from_u64(42);
        let mut rng_b = StdRng::seed_from_u64(42);

        let a: Vec<usize> = table
            .sample(EmotionLabel::Sad, 10, &mut rng_a)
            .unwrap()
            .iter()
            .map(|s| s.id)
            .collect();
        let b: Vec<usize> = table
            .sample(EmotionLabel::Sad, 10, &mut rng_b)
            .unwrap()
            .iter()
            .map(|s| s.id)
            .collect();

        assert_eq!(a, b);
    }

    #[test]
    fn too_few_rows_is_insufficient_data() {
        let table = table_with(MoodBucket::Cheerful, 4);
        let mut rng = StdRng::seed_from_u64(0);

        let err = table
            .sample(EmotionLabel::Neutral, 10, &mut rng)
            .unwrap_err();
        match err {
            PipelineError::InsufficientData { wanted, available } => {
                assert_eq!(wanted, 10);
                assert_eq!(available, 4);
            }
            other => panic!("unexpected error: {}", other),
        }
    }
}
