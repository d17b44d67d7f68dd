// Hand-maintained to match the tables created by DbContext::init_schema.

diesel::table! {
    articles (id) {
        id -> Integer,
        fingerprint -> Text,
        source -> Text,
        title -> Nullable<Text>,
        url -> Nullable<Text>,
        summary -> Nullable<Text>,
        published_at -> Nullable<Text>,
        published_date -> Nullable<Text>,
        sentiment_label -> Text,
        sentiment_polarity -> Double,
        sentiment_subjectivity -> Double,
        run_id -> Text,
        language_ok -> Integer,
        created_at -> Text,
    }
}

diesel::table! {
    entity_mentions (id) {
        id -> Integer,
        article_id -> Integer,
        surface_text -> Text,
        normalized_text -> Text,
        entity_type -> Text,
        confidence -> Double,
        start_char -> Integer,
        end_char -> Integer,
    }
}

diesel::table! {
    framing_phrases (id) {
        id -> Integer,
        article_id -> Integer,
        entity_text -> Text,
        normalized_entity -> Text,
        phrase_text -> Text,
    }
}

diesel::table! {
    pipeline_runs (run_id) {
        run_id -> Text,
        run_date -> Text,
        started_at -> Text,
        completed_at -> Nullable<Text>,
        status -> Text,
        collect_completed -> Integer,
        parse_completed -> Integer,
        clean_completed -> Integer,
        signal_completed -> Integer,
        total_sources -> Nullable<BigInt>,
        total_fetched -> Nullable<BigInt>,
        total_parsed -> Nullable<BigInt>,
        total_cleaned -> Nullable<BigInt>,
        total_analyzed -> Nullable<BigInt>,
        errors -> Nullable<Text>,
    }
}

diesel::table! {
    run_statistics (id) {
        id -> Integer,
        run_id -> Text,
        stage -> Text,
        metric_name -> Text,
        metric_value -> Nullable<Double>,
        details -> Nullable<Text>,
        created_at -> Text,
    }
}

diesel::table! {
    source_statistics (id) {
        id -> Integer,
        run_id -> Text,
        source_name -> Text,
        articles_fetched -> BigInt,
        succeeded -> Integer,
        error -> Nullable<Text>,
        created_at -> Text,
    }
}

diesel::joinable!(entity_mentions -> articles (article_id));
diesel::joinable!(framing_phrases -> articles (article_id));
diesel::joinable!(run_statistics -> pipeline_runs (run_id));
diesel::joinable!(source_statistics -> pipeline_runs (run_id));

diesel::allow_tables_to_appear_in_same_query!(
    articles,
    entity_mentions,
    framing_phrases,
    pipeline_runs,
    run_statistics,
    source_statistics,
);
