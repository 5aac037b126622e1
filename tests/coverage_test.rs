//! Integration tests for address coverage of loaded snapshots

use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

use netforest::config::Settings;
use netforest::domain::AddressFamily;
use netforest::infrastructure::di::ServiceContainer;

fn write_snapshot(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).expect("write snapshot");
    path
}

#[test]
fn given_nested_ipv4_snapshot_when_measuring_coverage_then_counts_outermost_blocks() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let path = write_snapshot(
        &temp,
        "ipv4.txt",
        "10.0.0.0/8\n10.1.0.0/16\n10.1.2.0/24\n192.168.0.0/16\n",
    );
    let container = ServiceContainer::new(Settings::default());

    // Act
    let (forest, _) = container.load_built(&path).unwrap();
    let coverage = forest.coverage();

    // Assert
    assert_eq!(coverage.family, Some(AddressFamily::Ipv4));
    assert_eq!(coverage.blocks, 4);
    assert_eq!(coverage.roots, 2);
    assert_eq!(coverage.addresses, (1 << 24) + (1 << 16));
    let expected = ((1u64 << 24) + (1 << 16)) as f64 / (1u64 << 32) as f64;
    assert!((coverage.share() - expected).abs() < 1e-12);
}

#[test]
fn given_asn_snapshot_when_measuring_coverage_then_counts_each_number_once() {
    let temp = TempDir::new().unwrap();
    let path = write_snapshot(&temp, "asn.txt", "AS1-AS100\nAS5-AS10\nAS7\nAS64512-AS65534\n");

    let (forest, _) = ServiceContainer::new(Settings::default())
        .load_built(&path)
        .unwrap();
    let coverage = forest.coverage();

    assert_eq!(coverage.family, Some(AddressFamily::Asn));
    assert_eq!(coverage.blocks, 4);
    assert_eq!(coverage.roots, 2);
    assert_eq!(coverage.addresses, 100 + 1023);
}

#[test]
fn given_empty_snapshot_when_measuring_coverage_then_nothing_covered() {
    let temp = TempDir::new().unwrap();
    let path = write_snapshot(&temp, "empty.txt", "# nothing yet\n");

    let (forest, _) = ServiceContainer::new(Settings::default())
        .load_built(&path)
        .unwrap();
    let coverage = forest.coverage();

    assert_eq!(coverage.family, None);
    assert_eq!(coverage.addresses, 0);
    assert_eq!(coverage.share(), 0.0);
}
