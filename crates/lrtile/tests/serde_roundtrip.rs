//! Serialized tiles reconstruct to the same block.
#![cfg(feature = "serde")]

mod common;

use common::random_low_rank;
use lrtile::{CompressedBlock, DenseBlock, RankPolicy, StorageReport, Tile};

#[test]
fn test_compressed_tile_round_trip() {
    let block = random_low_rank(12, 9, 2, 7);
    let tile = Tile::from_dense(block, 1e-10).unwrap();
    assert!(tile.is_compressed());
    let json = serde_json::to_string(&tile).unwrap();
    let back: Tile<f64> = serde_json::from_str(&json).unwrap();
    assert!(back.is_compressed());
    assert_eq!(back.rank(), tile.rank());
    assert_eq!(back.dims(), tile.dims());
    assert!(back.approx_eq(&tile.reconstruct(), 1e-14));
    assert!((back.cut().unwrap() - 1e-10).abs() < 1e-24);
}

#[test]
fn test_dense_tile_and_policy_round_trip() {
    let tile = Tile::dense(random_low_rank(4, 4, 4, 8));
    let json = serde_json::to_string(&tile).unwrap();
    let back: Tile<f64> = serde_json::from_str(&json).unwrap();
    assert!(back.is_dense());
    assert!(back.approx_eq(&tile.reconstruct(), 1e-14));

    let policy = RankPolicy::new().with_recompress_divisor(4);
    let json = serde_json::to_string(&policy).unwrap();
    assert_eq!(serde_json::from_str::<RankPolicy>(&json).unwrap(), policy);

    let report = StorageReport { full: 3, sparse: 2, low_rank: 1 };
    let json = serde_json::to_string(&report).unwrap();
    assert_eq!(serde_json::from_str::<StorageReport>(&json).unwrap(), report);
}

#[test]
fn test_invalid_payloads_are_rejected() {
    // data length disagrees with the extents
    let short = r#"{"dims":[2,2],"data":[1.0]}"#;
    assert!(serde_json::from_str::<DenseBlock<f64>>(short).is_err());
    assert!(serde_json::from_str::<DenseBlock<f64>>(r#"{"dims":[],"data":[]}"#).is_err());
    let dense_tile = format!(r#"{{"Dense":{short}}}"#);
    assert!(serde_json::from_str::<Tile<f64>>(&dense_tile).is_err());

    let policy = r#"{"recompress_divisor":6,"collapse_divisor":2}"#;
    let left = r#"{"dims":[2,1],"data":[1.0,2.0]}"#;
    let right = r#"{"dims":[1,3],"data":[1.0,0.0,-1.0]}"#;
    let compressed = |cut: &str, policy: &str, left: &str, right: &str| {
        format!(r#"{{"cut":{cut},"policy":{policy},"left":{left},"right":{right}}}"#)
    };

    let valid = compressed("1e-7", policy, left, right);
    let block: CompressedBlock<f64> = serde_json::from_str(&valid).unwrap();
    assert_eq!(block.rank(), 1);
    assert_eq!(block.dims(), vec![2, 3]);

    // rank 2 columns against a rank 1 right factor
    let wide_left = r#"{"dims":[2,2],"data":[1.0,2.0,3.0,4.0]}"#;
    let mismatch = compressed("1e-7", policy, wide_left, right);
    assert!(serde_json::from_str::<CompressedBlock<f64>>(&mismatch).is_err());

    let negative_cut = compressed("-1.0", policy, left, right);
    assert!(serde_json::from_str::<CompressedBlock<f64>>(&negative_cut).is_err());

    let zero_divisors = r#"{"recompress_divisor":0,"collapse_divisor":0}"#;
    assert!(serde_json::from_str::<RankPolicy>(zero_divisors).is_err());
    let zero_policy = compressed("1e-7", zero_divisors, left, right);
    assert!(serde_json::from_str::<CompressedBlock<f64>>(&zero_policy).is_err());
    let tile = format!(r#"{{"Compressed":{zero_policy}}}"#);
    assert!(serde_json::from_str::<Tile<f64>>(&tile).is_err());
}
