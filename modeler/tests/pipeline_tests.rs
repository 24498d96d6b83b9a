use modeler::{build_report, load_or_train, load_stopwords, read_lines, ModelOptions};
use std::fs;
use std::path::Path;
use tempfile::tempdir;
use topics_core::report::render;
use topics_core::{LdaConfig, StopwordList, TopicModel};

const DAY: u64 = 86_400;

fn write_inputs(dir: &Path) -> (Vec<String>, Vec<String>) {
    let posts = [
        "Ngopi di kafe yang baru :)",
        "Kopi susu gula aren enak bangeeet",
        "Gol!!! Timnas menang di final",
        "Wasit kasih kartu merah ke pemain",
        "Kopi hitam tanpa gula",
        "Pemain cadangan cetak gol",
    ];
    let docs: Vec<String> = posts.iter().map(|p| p.to_string()).collect();
    let stamps: Vec<String> = [0, 0, DAY, 3 * DAY, 3 * DAY + 60, 3 * DAY + 120]
        .iter()
        .map(|s| (s + 1_400_000_000 - 1_400_000_000 % DAY).to_string())
        .collect();
    fs::write(dir.join("docs.txt"), docs.join("\n")).unwrap();
    fs::write(dir.join("dates.txt"), stamps.join("\n")).unwrap();
    (docs, stamps)
}

fn options(dir: &Path) -> ModelOptions {
    ModelOptions {
        path: dir.join("models").join("model.bin"),
        config: LdaConfig::new(2).with_iterations(50).with_seed(7),
    }
}

#[test]
fn report_trains_saves_and_counts() {
    let dir = tempdir().unwrap();
    let (docs, stamps) = write_inputs(dir.path());
    assert_eq!(read_lines(&dir.path().join("docs.txt")).unwrap(), docs);

    let opts = options(dir.path());
    let stop = StopwordList::new(["di", "yang", "ke"]);
    let tls = build_report(&opts, &docs, &stamps, &stop, 3).unwrap();

    assert!(opts.path.exists());
    assert_eq!(tls.len(), 2);
    for tl in &tls {
        assert_eq!(tl.words.len(), 3);
        assert!(!tl.words.iter().any(|w| w == "di" || w == "yang"));
        let dates: Vec<&str> = tl.series.iter().map(|d| d.date.as_str()).collect();
        assert_eq!(dates, ["2014-05-13", "2014-05-14", "2014-05-15", "2014-05-16"]);
    }
    let per_day: Vec<u32> = (0..4).map(|i| tls.iter().map(|tl| tl.series[i].count).sum()).collect();
    assert_eq!(per_day, [2, 1, 0, 3]);
    assert!(render(&tls).starts_with("Topic-0,"));
}

#[test]
fn existing_model_is_reused() {
    let dir = tempdir().unwrap();
    let (docs, stamps) = write_inputs(dir.path());
    let opts = options(dir.path());
    let stop = StopwordList::default();
    build_report(&opts, &docs, &stamps, &stop, 5).unwrap();
    let saved = TopicModel::load(&opts.path).unwrap();

    // a different corpus must not trigger retraining while the artifact loads
    let other = vec!["sesuatu yang lain sama sekali".to_string()];
    let reused = load_or_train(&opts, &other, &stop).unwrap();
    assert_eq!(reused, saved);
}

#[test]
fn corrupt_model_is_retrained() {
    let dir = tempdir().unwrap();
    let (docs, stamps) = write_inputs(dir.path());
    let opts = options(dir.path());
    fs::create_dir_all(opts.path.parent().unwrap()).unwrap();
    fs::write(&opts.path, b"not a model at all").unwrap();

    let tls = build_report(&opts, &docs, &stamps, &StopwordList::default(), 2).unwrap();
    assert_eq!(tls.len(), 2);
    assert!(TopicModel::load(&opts.path).is_ok());
}

#[test]
fn mismatched_inputs_fail() {
    let dir = tempdir().unwrap();
    let (docs, stamps) = write_inputs(dir.path());
    let opts = options(dir.path());
    let err = build_report(&opts, &docs, &stamps[..4], &StopwordList::default(), 2).unwrap_err();
    assert!(err.to_string().contains("input mismatch"), "{err:#}");

    let mut bad = stamps.clone();
    bad[1] = "kemarin".into();
    assert!(build_report(&opts, &docs, &bad, &StopwordList::default(), 2).is_err());

    // rejected before any training, so nothing is left for the next run
    assert!(!opts.path.exists());
}

#[test]
fn stopwords_load_from_file_or_fallback() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("stop.txt");
    fs::write(&path, "Yang\n\n di \n").unwrap();
    let list = load_stopwords(Some(path.as_path())).unwrap();
    assert_eq!(list.len(), 2);

    let bundled = load_stopwords(None).unwrap();
    assert!(!bundled.is_empty());
    assert!(load_stopwords(Some(dir.path().join("missing.txt").as_path())).is_err());
}
