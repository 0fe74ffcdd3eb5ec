use pretty_assertions::assert_eq;
use textcore::{CharPosition, Content, ContentError, Position};

fn sample() -> Content {
    Content::from_text("alpha\n\nbeta gamma\ndelta\n")
}

#[test]
fn test_index_and_position_round_trip_everywhere() {
    let content = sample();
    for index in 0..=content.len() {
        let position = content.char_position(index).unwrap();
        assert_eq!(position.index, index);
        assert_eq!(
            content.char_index(position.line, position.column).unwrap(),
            index,
            "index {index} resolved to {position:?}"
        );
    }
}

#[test]
fn test_positions_at_line_boundaries() {
    let content = sample();

    assert_eq!(content.char_position(5).unwrap(), CharPosition::new(5, 0, 5));
    assert_eq!(content.char_position(6).unwrap(), CharPosition::new(6, 1, 0));
    assert_eq!(content.char_position(7).unwrap(), CharPosition::new(7, 2, 0));
    assert_eq!(content.char_line(content.len()).unwrap(), 4);
    assert_eq!(content.char_column(12).unwrap(), 5);
    assert!(content.char_position(content.len() + 1).is_err());
}

#[test]
fn test_indexer_follows_edits() {
    let mut content = sample();
    // Warm the cache up to the last line first.
    assert_eq!(content.char_index(3, 0).unwrap(), 18);

    content.insert(1, 0, "new\nlines").unwrap();
    assert_eq!(content.char_index(3, 0).unwrap(), 16);
    assert_eq!(content.char_index(4, 0).unwrap(), 27);

    content
        .delete(Position::new(0, 0), Position::new(2, 0))
        .unwrap();
    assert_eq!(content.char_index(1, 0).unwrap(), 6);
    assert_eq!(content.char_position(6).unwrap().position(), Position::new(1, 0));
}

#[test]
fn test_streaming_reads_match_random_access() {
    let content = sample();
    content.begin_stream_char_getting(0).unwrap();
    let streamed: String = (0..content.len())
        .map(|index| content.stream_char_at(index).unwrap())
        .collect();
    content.end_stream_char_getting();

    assert_eq!(streamed, content.to_string());
}

#[test]
fn test_streaming_backwards() {
    let content = sample();
    let last = content.len() - 1;
    content.begin_stream_char_getting(last).unwrap();
    let reversed: String = (0..content.len())
        .rev()
        .map(|index| content.stream_char_at(index).unwrap())
        .collect();
    content.end_stream_char_getting();

    assert_eq!(reversed, content.to_string().chars().rev().collect::<String>());
}

#[test]
fn test_stream_goes_stale_after_edit() {
    let mut content = sample();
    content.begin_stream_char_getting(0).unwrap();
    assert_eq!(content.stream_char_at(0).unwrap(), 'a');

    content.insert(0, 0, "x").unwrap();
    assert!(matches!(
        content.stream_char_at(1),
        Err(ContentError::StaleCache)
    ));

    content.end_stream_char_getting();
    assert!(matches!(
        content.stream_char_at(0),
        Err(ContentError::StaleCache)
    ));
}
