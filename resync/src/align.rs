use thiserror::Error;

#[derive(Debug, Error)]
pub enum AlignError {
    #[error("no frames to align")]
    NoFrames,
}

/// For each master timestamp, pick the client frame whose timestamp lies
/// closest on the shared zero-based timeline. Both series are normalized
/// so each starts at zero before comparison; a tie between two client
/// timestamps goes to the earlier frame, and every index clamps to the
/// available frame range.
///
/// An empty master series aligns to an empty output. Zero client frames
/// is an error: there is nothing to resample.
pub fn aligned_indices(
    master: &[f64],
    client: &[f64],
    frames: usize,
) -> Result<Vec<usize>, AlignError> {
    if frames == 0 {
        return Err(AlignError::NoFrames);
    }
    if master.is_empty() {
        return Ok(Vec::new());
    }

    let mut master = master.to_vec();
    let mut client = client.to_vec();
    pts::normalize(&mut master);
    pts::normalize(&mut client);

    let last = frames - 1;
    Ok(master
        .iter()
        .map(|&m| nearest(&client, m).min(last))
        .collect())
}

fn nearest(series: &[f64], t: f64) -> usize {
    if series.is_empty() {
        return 0;
    }
    let i = series.partition_point(|&s| s < t);
    if i == 0 {
        return 0;
    }
    if i == series.len() {
        return series.len() - 1;
    }
    if (t - series[i - 1]) <= (series[i] - t) {
        i - 1
    } else {
        i
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearest_match_with_trailing_clamp() {
        let master = [0.0, 100.0, 200.0, 300.0];
        let client = [0.0, 90.0, 210.0];
        let indices = aligned_indices(&master, &client, 3).unwrap();
        assert_eq!(indices, vec![0, 1, 2, 2]);
    }

    #[test]
    fn offset_series_are_normalized_first() {
        // Same shape as above, shifted by different start times.
        let master = [5_000.0, 5_100.0, 5_200.0, 5_300.0];
        let client = [70.0, 160.0, 280.0];
        let indices = aligned_indices(&master, &client, 3).unwrap();
        assert_eq!(indices, vec![0, 1, 2, 2]);
    }

    #[test]
    fn empty_master_aligns_to_empty_output() {
        let indices = aligned_indices(&[], &[0.0, 33.0], 2).unwrap();
        assert!(indices.is_empty());
    }

    #[test]
    fn zero_frames_is_an_error() {
        let err = aligned_indices(&[0.0, 100.0], &[], 0).unwrap_err();
        assert!(matches!(err, AlignError::NoFrames));
    }

    #[test]
    fn indices_clamp_to_frame_count() {
        // Client log has more entries than the stream has frames.
        let master = [0.0, 50.0, 100.0, 150.0];
        let client = [0.0, 50.0, 100.0, 150.0];
        let indices = aligned_indices(&master, &client, 2).unwrap();
        assert_eq!(indices, vec![0, 1, 1, 1]);
    }

    #[test]
    fn ties_prefer_the_earlier_frame() {
        let master = [0.0, 50.0];
        let client = [0.0, 25.0, 75.0];
        let indices = aligned_indices(&master, &client, 3).unwrap();
        assert_eq!(indices, vec![0, 1]);
    }

    #[test]
    fn master_longer_than_client_repeats_last_frame() {
        let master = [0.0, 100.0, 200.0, 300.0, 400.0, 500.0];
        let client = [0.0, 100.0];
        let indices = aligned_indices(&master, &client, 2).unwrap();
        assert_eq!(indices, vec![0, 1, 1, 1, 1, 1]);
    }
}
