//! Store build / persist / query scenarios
//!
//! These tests drive the public library API end to end: VCF sources on disk,
//! archives written to temporary directories, and lookups against the
//! reloaded stores.

use std::fs;
use std::path::{Path, PathBuf};

use allele_store::archive::{self, Compression};
use allele_store::core::types::{Absence, BuildInfo, Lookup};
use allele_store::index::cross::Projection;
use allele_store::index::position::SortedPositionIndex;
use allele_store::store::annotation::{build_annotation_cache, AnnotationCache};
use allele_store::store::curated::{build_curated_store, CuratedStore, CuratedStoreBuilder};
use allele_store::store::coverage::{build_coverage_store, CoverageStore};
use allele_store::store::dvd::{build_dvd_store, DvdStore};
use allele_store::store::frequency::{build_frequency_store, FrequencyStore};
use allele_store::store::layout::inspect;
use allele_store::store::population::{build_population_store, list_chunks, ChunkWriter, PopulationStore};
use allele_store::{
    ChromIndex, CoverageClass, Database, DatabaseLayout, FrequencyBucket, IngestRecord, StoreConfig, StoreError,
};
use tempfile::TempDir;

const HEADER: &str = "##fileformat=VCFv4.2
##fileDate=20130502
##INFO=<ID=AF,Number=A,Type=Float,Description=\"Allele Frequency\">
##INFO=<ID=AN,Number=1,Type=Integer,Description=\"Allele Number\">
##INFO=<ID=AC,Number=A,Type=Integer,Description=\"Allele Count\">
##INFO=<ID=nhomalt,Number=A,Type=Integer,Description=\"Homozygote count\">
##INFO=<ID=CSQ,Number=.,Type=String,Description=\"Consequence annotations from Ensembl VEP. Format: Allele|Consequence|Feature|CDS_position|Protein_position\">
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO
";

fn write_vcf(dir: &Path, name: &str, rows: &[&str]) -> PathBuf {
    let path = dir.join(name);
    let mut content = HEADER.to_string();
    for row in rows {
        content.push_str(&row.replace(' ', "\t"));
        content.push('\n');
    }
    fs::write(&path, content).expect("Failed to write VCF fixture");
    path
}

fn small_chunks(chunk_size: u32) -> StoreConfig {
    StoreConfig {
        chunk_size,
        ..StoreConfig::default()
    }
}

/// Three alleles with raw frequencies survive build, save and load
#[test]
fn test_end_to_end_frequency_scenario() {
    let dir = TempDir::new().unwrap();
    let source = write_vcf(
        dir.path(),
        "kg.vcf",
        &[
            "1 16103 . T G 100 PASS AF=0.02",
            "1 83912 . AGAG - 100 PASS AF=0.16",
            "1 91552 . - T 100 PASS AF=0.07",
        ],
    );
    let output = dir.path().join("k_genome.arc");
    let built = build_frequency_store(&[source], &output, &StoreConfig::default()).unwrap();

    let (header, store) = FrequencyStore::load(&output).unwrap();
    assert_eq!(store, built);
    assert_eq!(header.info.source_version, "20130502");

    let af = store.find("1", 16103, "T", "G").unwrap().found().unwrap();
    assert!((af - 0.02).abs() < 1e-6);
    assert_eq!(
        store.find("1", 16103, "T", "A").unwrap(),
        Lookup::Missing(Absence::NoRecord)
    );
    let af = store.find("1", 91552, "-", "T").unwrap().found().unwrap();
    assert!((af - 0.07).abs() < 1e-6);
    let af = store.find("1", 83912, "AGAG", "-").unwrap().found().unwrap();
    assert!((af - 0.16).abs() < 1e-6);

    // the anchored spellings of the same alleles resolve identically
    assert!(store.find("1", 83911, "CAGAG", "C").unwrap().is_found());
    assert!(store.find("chr1", 91551, "A", "AT").unwrap().is_found());
}

/// Chromosome 2 lookups never return chromosome 1 records at the same position
#[test]
fn test_cross_chromosome_isolation() {
    let dir = TempDir::new().unwrap();
    let source = write_vcf(
        dir.path(),
        "clinvar.vcf",
        &[
            "1 500 101 A G . . CLNSIG=Pathogenic;GENEINFO=GENE1:1",
            "1 900 102 C T . . CLNSIG=Benign;GENEINFO=GENE1:1",
            "2 500 201 A G . . CLNSIG=Uncertain_significance;GENEINFO=GENE2:2",
        ],
    );
    let output = dir.path().join("clinvar.arc");
    build_curated_store(&source, &output, &StoreConfig::default()).unwrap();
    let (_, store) = CuratedStore::load(&output).unwrap();

    let chr1 = ChromIndex::parse("1").unwrap();
    let chr2 = ChromIndex::parse("2").unwrap();
    assert_eq!(store.len_on(chr1), 2);
    assert_eq!(store.len_on(chr2), 1);

    let record = store.find("2", 500, "A", "G").unwrap().found().unwrap();
    assert_eq!(record.variation_id, Some(201));
    assert_eq!(record.significance, "Uncertain_significance");
    assert!(!store.find("2", 900, "C", "T").unwrap().is_found());
}

/// Three alleles at one position are told apart; a fourth is not found
#[test]
fn test_duplicate_positions_disambiguate() {
    let dir = TempDir::new().unwrap();
    let source = write_vcf(
        dir.path(),
        "gnomad.chr7.vcf",
        &[
            "7 1000 . C A . PASS AN=40000;AC=2;AF=0.00005;nhomalt=0",
            "7 1000 . C T . PASS AN=40000;AC=400;AF=0.01;nhomalt=3",
            "7 1000 . C CTT . PASS AN=40000;AC=100;AF=0.0025;nhomalt=1",
        ],
    );
    let db = dir.path().join("gnomad");
    build_population_store(&[source], &db, &small_chunks(10_000)).unwrap();

    let mut store = PopulationStore::open(&db, &StoreConfig::default()).unwrap();
    let a = store.find("7", 1000, "C", "A").unwrap().found().unwrap();
    let t = store.find("7", 1000, "C", "T").unwrap().found().unwrap();
    let ins = store.find("7", 1001, "-", "TT").unwrap().found().unwrap();
    assert_eq!(a.frequency, FrequencyBucket::Rare);
    assert_eq!(t.frequency, FrequencyBucket::Common);
    assert!(a.frequency < ins.frequency && ins.frequency < t.frequency);
    assert_eq!(
        store.find("7", 1000, "C", "G").unwrap(),
        Lookup::Missing(Absence::NoRecord)
    );
}

/// A record at `chunk_size` lands in chunk 1; going back to `chunk_size - 1` reloads chunk 0
#[test]
fn test_chunk_boundary_reload() {
    let dir = TempDir::new().unwrap();
    let config = small_chunks(1_000);
    let mut writer = ChunkWriter::new(dir.path(), &config, BuildInfo::now("test"));
    for pos in [999, 1000] {
        let record = IngestRecord::new("1", pos, "A", "G")
            .with_info("AN", "20000")
            .with_info("AC", "5")
            .with_info("AF", "0.0002");
        writer.push(&record).unwrap();
    }
    let summary = writer.finish().unwrap();
    assert_eq!(summary.chunks_written, 2);

    let mut store = PopulationStore::open(dir.path(), &config).unwrap();
    assert!(store.find("1", 1000, "A", "G").unwrap().is_found());
    assert_eq!(store.load_count(), 1);
    assert!(store.find("1", 999, "A", "G").unwrap().is_found());
    assert_eq!(store.load_count(), 2);
    assert!(store.find("1", 999, "A", "G").unwrap().is_found());
    assert_eq!(store.load_count(), 2);
    assert!(store.find("1", 1000, "A", "G").unwrap().is_found());
    assert_eq!(store.load_count(), 3);
}

/// Chromosome A, B, A costs two loads of A and one of B
#[test]
fn test_annotation_cache_swap() {
    let dir = TempDir::new().unwrap();
    let source = write_vcf(
        dir.path(),
        "annotated.vcf",
        &[
            "3 100 . A G . . CSQ=G|missense_variant|ENST00000001.4|300|100",
            "4 100 . A G . . CSQ=G|synonymous_variant|ENST00000002.1|300|100",
        ],
    );
    let cache_dir = dir.path().join("vep_cache");
    build_annotation_cache(&source, &cache_dir, &StoreConfig::default()).unwrap();

    let mut cache = AnnotationCache::open(&cache_dir).unwrap();
    assert!(cache.find("3", 100, "A", "G").unwrap().is_found());
    assert!(cache.find("4", 100, "A", "G").unwrap().is_found());
    let payload = cache.find("3", 100, "A", "G").unwrap().found().unwrap().to_string();
    assert_eq!(cache.load_count(), 3);
    assert!(payload.contains("missense_variant"));
    assert_eq!(cache.meta().layout.column("Protein_position"), Some(4));
}

/// A shuffled source is rejected with the offending and preceding positions
#[test]
fn test_shuffled_input_detected() {
    let dir = TempDir::new().unwrap();
    let source = write_vcf(
        dir.path(),
        "shuffled.vcf",
        &[
            "5 300 . A G . PASS AF=0.1",
            "5 100 . A G . PASS AF=0.1",
            "5 200 . A G . PASS AF=0.1",
        ],
    );
    let err = build_frequency_store(&[source], &dir.path().join("out.arc"), &StoreConfig::default())
        .unwrap_err();
    match err {
        StoreError::UnsortedInput {
            chrom,
            index,
            position,
            previous,
            ..
        } => {
            assert_eq!(chrom, "5");
            assert_eq!((index, position, previous), (1, 100, 300));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!dir.path().join("out.arc").exists());

    let chrom = ChromIndex::parse("5").unwrap();
    let mut index = SortedPositionIndex::new();
    for pos in [300, 100, 200] {
        index.insert(chrom, pos, pos);
    }
    assert_eq!(index.first_unsorted(chrom), Some(1));
    index.sort_stable(chrom);
    assert!(index.verify_sorted(chrom));
}

/// A curated store reloads with identical indices and both secondary lookups
#[test]
fn test_curated_persistence_round_trip() {
    let dir = TempDir::new().unwrap();
    let source = write_vcf(
        dir.path(),
        "clinvar.vcf",
        &[
            "17 7673802 12374 C T . . ALLELEID=27413;CLNSIG=Pathogenic;CLNREVSTAT=reviewed_by_expert_panel;GENEINFO=TP53:7157;CLNVI=UniProtKB:P04637#VAR_005932;CSQ=T|missense_variant|NM_000546.6|743|248,T|missense_variant|NM_001126112.3|743|248",
            "17 7673803 12375 G A . . ALLELEID=27414;CLNSIG=Likely_pathogenic;CLNREVSTAT=criteria_provided,_single_submitter;GENEINFO=TP53:7157;CSQ=A|missense_variant|NM_000546.6|742|248",
            "17 7674220 12376 C T . . ALLELEID=27415;CLNSIG=Pathogenic;GENEINFO=TP53:7157;CSQ=T|stop_gained|NM_000546.6|637|213",
        ],
    );
    let output = dir.path().join("clinvar.arc");
    let built = build_curated_store(&source, &output, &StoreConfig::default()).unwrap();
    let (header, loaded) = CuratedStore::load(&output).unwrap();
    assert_eq!(header.kind, "curated");
    assert_eq!(loaded, built);
    assert_eq!(loaded.len(), 3);
    assert_eq!(loaded.id_count(), 3);

    let record = loaded.find_by_id(12374).found().unwrap();
    assert_eq!(record.protein_change.as_deref(), Some("VAR_005932"));
    assert_eq!(record.allele_id, Some(27413));
    assert_eq!(record.stars(), 3);

    let window = loaded.find_in_range("NM_000546", 248, 248, Projection::Protein);
    let ids: Vec<_> = window.iter().filter_map(|r| r.variation_id).collect();
    assert_eq!(ids, vec![12374, 12375]);
    // stop_gained rows do not enter the coordinate index
    assert!(loaded
        .find_in_range("NM_000546", 600, 700, Projection::Coding)
        .is_empty());

    // re-saving with the other backend keeps the content
    let gz = dir.path().join("clinvar.gz.arc");
    loaded
        .save(&gz, &header.info, Compression::new(archive::Backend::Gzip))
        .unwrap();
    assert_eq!(CuratedStore::load(&gz).unwrap().1, built);
}

/// Population sources build in parallel, one chromosome each
#[test]
fn test_parallel_population_build() {
    let dir = TempDir::new().unwrap();
    let sources: Vec<PathBuf> = ["1", "2", "X"]
        .iter()
        .map(|chrom| {
            write_vcf(
                dir.path(),
                &format!("chr{chrom}.vcf"),
                &[
                    format!("chr{chrom} 10 . A G . PASS AN=30000;AC=30;AF=0.001;nhomalt=0").as_str(),
                    format!("chr{chrom} 2500 . T C . AS_VQSR AN=30000;AC=30;AF=0.001;nhomalt=0").as_str(),
                ],
            )
        })
        .collect();
    let db = dir.path().join("gnomad");
    let config = StoreConfig {
        workers: 2,
        ..small_chunks(1_000)
    };
    let summary = build_population_store(&sources, &db, &config).unwrap();
    assert_eq!(summary.chromosomes.len(), 3);
    assert_eq!(summary.chunks_written, 6);

    let mut store = PopulationStore::open(&db, &config).unwrap();
    let status = store.find("X", 2500, "T", "C").unwrap().found().unwrap();
    assert_eq!(status.frequency, FrequencyBucket::Filtered);
    assert_eq!(
        store.find("Y", 10, "A", "G").unwrap(),
        Lookup::Missing(Absence::MissingPartition)
    );

    // the same chromosome in two sources is rejected, and the earlier build survives
    let again = build_population_store(&[sources[0].clone(), sources[0].clone()], &db, &config);
    assert!(matches!(again, Err(StoreError::InvalidRecord(_))));
    let mut store = PopulationStore::open(&db, &config).unwrap();
    assert!(store.find("2", 10, "A", "G").unwrap().is_found());
    assert_eq!(list_chunks(&db).values().sum::<usize>(), 6);
}

/// A build rejected for overlapping sources writes nothing into the store directory
#[test]
fn test_rejected_population_build_leaves_no_partitions() {
    let dir = TempDir::new().unwrap();
    let first = write_vcf(dir.path(), "a.vcf", &["1 10 . A T . PASS AN=30000;AC=300;AF=0.01;nhomalt=0"]);
    let second = write_vcf(
        dir.path(),
        "b.vcf",
        &[
            "1 10 . A T . PASS AN=30000;AC=300;AF=0.01;nhomalt=0",
            "1 5000 . A T . PASS AN=30000;AC=3000;AF=0.1;nhomalt=5",
        ],
    );
    let db = dir.path().join("gnomad");
    let config = StoreConfig {
        workers: 2,
        ..small_chunks(1_000)
    };

    let result = build_population_store(&[first, second], &db, &config);
    assert!(matches!(result, Err(StoreError::InvalidRecord(_))));
    assert_eq!(fs::read_dir(&db).unwrap().count(), 0);
    assert!(list_chunks(&db).is_empty());
    assert!(!archive::archive_path(&db, "meta").exists());
}

/// Records without an integer id stay reachable by position only
#[test]
fn test_builder_accepts_records_without_ids() {
    let mut builder = CuratedStoreBuilder::new(None);
    builder
        .push(&IngestRecord::new("X", 100, "G", "A").with_info("CLNSIG", "Benign"))
        .unwrap();
    let store = builder.finish().unwrap();
    assert_eq!(store.len(), 1);
    assert_eq!(store.id_count(), 0);
    assert!(store.find("X", 100, "G", "A").unwrap().is_found());
}

/// DVD records survive build, save and load, and are reachable through the database set
#[test]
fn test_dvd_store_persistence() {
    let dir = TempDir::new().unwrap();
    let source = write_vcf(
        dir.path(),
        "dvd.vcf",
        &[
            "chr1 6425205 rs184469259 G T . PASS FINAL_DISEASE=.;FINAL_PATHOGENICITY=Benign;FINAL_PMID=28492532;GENE=ESPN",
            "chr1 6425219 . G A . PASS FINAL_DISEASE=.;FINAL_PATHOGENICITY=Pathogenic;FINAL_PMID=.;GENE=ESPN",
            "chr1 6426292 rs775045632 AC A . PASS FINAL_PATHOGENICITY=Unknown_significance;GENE=ESPN",
        ],
    );
    let layout = DatabaseLayout::under(&dir.path().join("db"));
    let built = build_dvd_store(&source, &layout.dvd, &StoreConfig::default()).unwrap();

    let (header, store) = DvdStore::load(&layout.dvd).unwrap();
    assert_eq!(store, built);
    assert_eq!(header.kind, "dvd");
    assert_eq!(header.info.source_version, "20130502");

    let benign = store.find("1", 6425205, "G", "T").unwrap().found().unwrap();
    assert_eq!(benign.id.as_deref(), Some("rs184469259"));
    assert_eq!(benign.pmids, "28492532");
    assert!(store.find("1", 6426293, "C", "-").unwrap().is_found());
    assert_eq!(store.gene_symbol("chr1", 6425219).unwrap(), Lookup::Found("ESPN"));

    let mut db = Database::open(&layout, &StoreConfig::default()).unwrap();
    assert_eq!(db.open_count(), 1);
    let report = db.lookup("1", 6425219, "G", "A").unwrap();
    assert_eq!(report.dvd.unwrap().found().unwrap().pathogenicity, "Pathogenic");
    assert_eq!(report.curated, None);
}

/// A gzip coverage summary in a release directory builds a run-length store
#[test]
fn test_coverage_store_persistence() {
    use flate2::write::GzEncoder;
    use std::io::Write;

    let dir = TempDir::new().unwrap();
    let release = dir.path().join("release").join("3.0.1");
    fs::create_dir_all(&release).unwrap();
    let source = release.join("coverage.tsv.bgz");
    let mut encoder = GzEncoder::new(fs::File::create(&source).unwrap(), flate2::Compression::default());
    encoder
        .write_all(
            b"locus\tmean\tmedian_approx\tover_20\n\
chr1:100\t50.0\t50\t0.9\n\
chr1:101\t49.0\t49\t0.9\n\
chr1:102\t12.0\t10\t0.3\n\
chr1:150\t2.0\t1\t0.01\n\
chrM:1\t900.0\t900\t1.0\n",
        )
        .unwrap();
    encoder.finish().unwrap();

    let layout = DatabaseLayout::under(&dir.path().join("db"));
    let summary = build_coverage_store(&source, &layout.coverage, &StoreConfig::default()).unwrap();
    assert_eq!(summary.rows, 4);
    assert_eq!(summary.runs, 4);
    assert_eq!(summary.unknown_chromosome, 1);

    let (header, store) = CoverageStore::load(&layout.coverage).unwrap();
    assert_eq!(header.info.source_version, "3.0.1");
    assert_eq!(store.find("1", 99).unwrap(), Lookup::Found(CoverageClass::Low));
    assert_eq!(store.find("1", 101).unwrap(), Lookup::Found(CoverageClass::Full));
    assert_eq!(store.find("1", 120).unwrap(), Lookup::Found(CoverageClass::Partial));
    assert_eq!(store.find("1", 10_000).unwrap(), Lookup::Found(CoverageClass::Low));
    assert_eq!(store.find("X", 10).unwrap(), Lookup::Missing(Absence::MissingPartition));

    let mut db = Database::open(&layout, &StoreConfig::default()).unwrap();
    let report = db.lookup("1", 101, "A", "G").unwrap();
    assert_eq!(report.coverage, Some(Lookup::Found(CoverageClass::Full)));
    assert_eq!(report.dvd, None);

    let entries = inspect(&layout).unwrap();
    let coverage = entries.iter().find(|e| e.store == "coverage").unwrap();
    assert_eq!(coverage.kind.as_deref(), Some("coverage"));
    assert_eq!(coverage.source_version.as_deref(), Some("3.0.1"));
}
