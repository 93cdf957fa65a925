use super::*;

#[test]
fn test_parses_colon_and_equals_entries() {
    let sections = parse_sections("[DB1]\nhost_name: localhost\nport=3306\n").unwrap();

    let db1 = sections.get("DB1").unwrap();
    assert_eq!(db1.get("host_name"), Some("localhost"));
    assert_eq!(db1.get("port"), Some("3306"));
}

#[test]
fn test_first_delimiter_wins() {
    let text = "[jdbc]\ndatasource[0]: Hibernate/type=javax.sql.DataSource\nurl = jdbc:mysql://h:3306/db\n";
    let sections = parse_sections(text).unwrap();

    let jdbc = sections.get("jdbc").unwrap();
    assert_eq!(
        jdbc.get("datasource[0]"),
        Some("Hibernate/type=javax.sql.DataSource")
    );
    assert_eq!(jdbc.get("url"), Some("jdbc:mysql://h:3306/db"));
}

#[test]
fn test_keys_are_lower_cased_and_sections_keep_case() {
    let sections = parse_sections("[oti/metadata.xmi]\nDATABASE_PORT: 3306\n").unwrap();

    let section = sections.get("oti/metadata.xmi").unwrap();
    assert_eq!(section.get("database_port"), Some("3306"));
    assert_eq!(section.get("DATABASE_PORT"), None);
}

#[test]
fn test_continuation_lines_join_with_newline() {
    let text = "[kettle]\nxml: <kettle-repository>\n    <repository.name>A_REPO</repository.name>\n    </kettle-repository>\n";
    let sections = parse_sections(text).unwrap();

    assert_eq!(
        sections.get("kettle").unwrap().get("xml"),
        Some("<kettle-repository>\n<repository.name>A_REPO</repository.name>\n</kettle-repository>")
    );
}

#[test]
fn test_blank_lines_inside_continuation_are_dropped() {
    let text = "[s]\nxml: <a>\n\n    <b/>\n    </a>\n";
    let sections = parse_sections(text).unwrap();

    assert_eq!(sections.get("s").unwrap().get("xml"), Some("<a>\n<b/>\n</a>"));
}

#[test]
fn test_comments_are_skipped_but_inline_semicolons_are_kept() {
    let text = "# leading comment\n[olap]\n; another\nname: Provider=Mondrian;DataSource=Pentaho\n";
    let sections = parse_sections(text).unwrap();

    assert_eq!(
        sections.get("olap").unwrap().get("name"),
        Some("Provider=Mondrian;DataSource=Pentaho")
    );
}

#[test]
fn test_empty_value_is_allowed() {
    let sections = parse_sections("[hibernate0]\nname: Moodle\nquery:\n").unwrap();

    assert_eq!(sections.get("hibernate0").unwrap().get("query"), Some(""));
}

#[test]
fn test_repeated_key_overwrites_in_place() {
    let sections = parse_sections("[s]\na: 1\nb: 2\na: 3\n").unwrap();

    let pairs: Vec<(&str, &str)> = sections.get("s").unwrap().iter().collect();
    assert_eq!(pairs, vec![("a", "3"), ("b", "2")]);
}

#[test]
fn test_entry_before_header_is_rejected() {
    let result = parse_sections("host: localhost\n[s]\n");

    assert!(matches!(
        result,
        Err(ConfigParseError::MissingSectionHeader { line: 1 })
    ));
}

#[test]
fn test_line_without_delimiter_is_rejected() {
    let result = parse_sections("[s]\nthis line has no delimiter\n");

    match result {
        Err(ConfigParseError::MalformedLine { line, content }) => {
            assert_eq!(line, 2);
            assert_eq!(content, "this line has no delimiter");
        }
        other => panic!("Expected MalformedLine, got {:?}", other),
    }
}

#[test]
fn test_continuation_without_key_is_rejected() {
    let result = parse_sections("[s]\n    dangling\n");

    assert!(matches!(
        result,
        Err(ConfigParseError::MalformedLine { line: 2, .. })
    ));
}

#[test]
fn test_duplicate_section_is_rejected() {
    let result = parse_sections("[DB1]\na: 1\n[DB1]\nb: 2\n");

    match result {
        Err(ConfigParseError::DuplicateSection { name, line }) => {
            assert_eq!(name, "DB1");
            assert_eq!(line, 3);
        }
        other => panic!("Expected DuplicateSection, got {:?}", other),
    }
}

#[test]
fn test_empty_and_unterminated_headers_are_rejected() {
    assert!(matches!(
        parse_sections("[ ]\n"),
        Err(ConfigParseError::EmptySectionName { line: 1 })
    ));
    assert!(matches!(
        parse_sections("[broken\n"),
        Err(ConfigParseError::MalformedLine { line: 1, .. })
    ));
}

#[test]
fn test_source_without_sections_is_rejected() {
    assert!(matches!(
        parse_sections("# only a comment\n\n"),
        Err(ConfigParseError::NoSections)
    ));
    assert!(matches!(parse_sections(""), Err(ConfigParseError::NoSections)));
}

#[test]
fn test_render_indents_continuations() {
    let sections = parse_sections("[s]\nxml: <a>\n    </a>\nquery:\n").unwrap();

    assert_eq!(render_sections(&sections), "[s]\nxml: <a>\n    </a>\nquery:\n");
}

#[test]
fn test_semicolon_after_whitespace_stays_in_value() {
    let text = "[hibernate0]\nurl: jdbc:derby:memory:db ;create=true\n";
    let sections = parse_sections(text).unwrap();

    assert_eq!(
        sections.get("hibernate0").unwrap().get("url"),
        Some("jdbc:derby:memory:db ;create=true")
    );
}
