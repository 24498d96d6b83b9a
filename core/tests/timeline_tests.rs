use time::macros::date;
use topics_core::timeline::{calendar, dates_from_epochs, histogram};
use topics_core::{Error, Mismatch};

const DAY: i64 = 86_400;

#[test]
fn calendar_spans_first_to_last_day() {
    let stamps: Vec<String> = [0, 9 * DAY + 5, 3 * DAY, 3 * DAY + 100].iter().map(i64::to_string).collect();
    let dates = dates_from_epochs(&stamps).unwrap();
    let assignments = [0, 1, 1, 0];
    let hist = histogram(&assignments, &dates, 2).unwrap();

    assert_eq!(hist.calendar().len(), 10);
    assert_eq!(hist.calendar()[0], date!(1970 - 01 - 01));
    assert_eq!(hist.calendar()[9], date!(1970 - 01 - 10));

    let mut expected = vec![0u32; 10];
    expected[0] = 1;
    expected[3] = 2;
    expected[9] = 1;
    assert_eq!(hist.day_totals(), expected);
    assert_eq!(hist.counts(0).unwrap()[3], 1);
    assert_eq!(hist.counts(1).unwrap()[3], 1);
    assert!(hist.counts(2).is_none());
}

#[test]
fn same_timestamp_gives_one_day() {
    let dates = dates_from_epochs(&["100", "100"]).unwrap();
    let hist = histogram(&[1, 1], &dates, 3).unwrap();
    assert_eq!(hist.calendar().len(), 1);
    assert_eq!(hist.per_topic(), &[vec![0], vec![2], vec![0]]);
}

#[test]
fn every_document_is_counted_once() {
    let stamps: Vec<String> = (0..50).map(|i| ((i * 7919) % 20 * DAY).to_string()).collect();
    let dates = dates_from_epochs(&stamps).unwrap();
    let assignments: Vec<usize> = (0..50).map(|i| i % 4).collect();
    let hist = histogram(&assignments, &dates, 4).unwrap();
    assert_eq!(hist.day_totals().iter().sum::<u32>(), 50);
    for (day, slot) in hist.calendar().iter().zip(0..) {
        let on_day = dates.iter().filter(|d| *d == day).count() as u32;
        assert_eq!(hist.day_totals()[slot], on_day);
    }
}

#[test]
fn empty_input_gives_empty_histogram() {
    let hist = histogram(&[], &[], 3).unwrap();
    assert!(hist.calendar().is_empty());
    assert_eq!(hist.n_topics(), 3);
    assert!(calendar(&[]).is_empty());
}

#[test]
fn length_mismatch_is_an_error() {
    let dates = dates_from_epochs(&["0", "0", "0"]).unwrap();
    let err = histogram(&[0, 0], &dates, 1).unwrap_err();
    assert!(matches!(err, Error::InputMismatch(Mismatch::Length { assignments: 2, dates: 3 })));
}

#[test]
fn topic_out_of_range_is_an_error() {
    let dates = dates_from_epochs(&["0", "0"]).unwrap();
    let err = histogram(&[0, 5], &dates, 2).unwrap_err();
    assert!(matches!(
        err,
        Error::InputMismatch(Mismatch::TopicOutOfRange { index: 1, topic: 5, n_topics: 2 })
    ));
}

#[test]
fn bad_timestamp_names_its_line() {
    let err = dates_from_epochs(&["0", " 86400 ", "soon"]).unwrap_err();
    match err {
        Error::InputMismatch(Mismatch::Timestamp { index, value }) => {
            assert_eq!(index, 2);
            assert_eq!(value, "soon");
        }
        other => panic!("unexpected error {other:?}"),
    }
}
