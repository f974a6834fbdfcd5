//! Decode worker outcome tests
//!
//! Drives `Decoder::process` with recording collaborators and checks what
//! ends up in the cache, the job queue and the job's failure logs.

mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;

use common::{Download, Harness, text};
use yenc_decoder::yenc::encode_article;
use yenc_decoder::{
    Article, ArticleLog, DecodeRequest, DecodeStatus, DecoderConfig, DecoderEvent, FileType, Job,
    NzbFile,
};

const PRIMARY: &str = "news1:119";

fn encoded(data: &[u8]) -> Vec<Vec<u8>> {
    encode_article(data, "my.download.rar", 128, None).unwrap()
}

#[test]
fn test_decoded_article_is_cached_and_registered() {
    let h = Harness::new(&[("news1", 0)]);
    let dl = Download::new(PRIMARY);

    let verdict = h.decoder.process(&dl.request(encoded(b"binary payload")));

    assert_eq!(verdict.status, DecodeStatus::Decoded);
    assert_eq!(
        h.cache.saved(),
        vec![(
            "<part1of1@example.com>".to_string(),
            b"binary payload".to_vec()
        )]
    );
    assert_eq!(
        h.queue.registered(),
        vec![("<part1of1@example.com>".to_string(), true)]
    );
    assert_eq!(dl.file.filename(), "my.download.rar");
    assert_eq!(dl.file.file_type(), FileType::Yenc);
    assert_eq!(dl.file.article_count(), 1);
    for log in ArticleLog::ALL {
        assert_eq!(dl.job.log_count(log), 0);
    }
}

#[test]
fn test_yenc_name_only_taken_once() {
    let h = Harness::new(&[("news1", 0)]);
    let dl = Download::new(PRIMARY);

    h.decoder.process(&dl.request(encoded(b"one")));
    let second = encode_article(b"two", "renamed.rar", 128, None).unwrap();
    h.decoder.process(&dl.request(second));

    assert_eq!(dl.file.filename(), "my.download.rar");
}

#[test]
fn test_crc_mismatch_is_cached_logged_and_found() {
    let h = Harness::new(&[("news1", 0)]);
    let dl = Download::new(PRIMARY);
    let mut lines = encoded(b"abc");
    let last = lines.len() - 1;
    lines[last] = b"=yend size=3 crc32=00000000".to_vec();

    let verdict = h.decoder.process(&dl.request(lines));

    assert_eq!(verdict.status, DecodeStatus::CrcMismatch);
    assert_eq!(h.cache.saved().len(), 1);
    assert_eq!(h.cache.saved()[0].1, b"abc");
    assert_eq!(
        h.queue.registered(),
        vec![("<part1of1@example.com>".to_string(), true)]
    );
    assert_eq!(dl.job.log(ArticleLog::Bad), vec!["<part1of1@example.com>"]);
    // The envelope was readable, so the file is known to be yEnc
    assert_eq!(dl.file.file_type(), FileType::Yenc);
    assert_eq!(dl.file.article_count(), 0);
}

#[test]
fn test_empty_article_without_other_server_is_missing_once() {
    let h = Harness::new(&[("news1", 0)]);
    let dl = Download::new(PRIMARY);
    let mut events = h.decoder.subscribe();

    let verdict = h.decoder.process(&dl.request(Vec::new()));

    assert_eq!(verdict.status, DecodeStatus::EmptyResponse);
    assert_eq!(dl.job.log_count(ArticleLog::Missing), 1);
    assert!(h.cache.saved().is_empty());
    assert_eq!(
        h.queue.registered(),
        vec![("<part1of1@example.com>".to_string(), false)]
    );
    assert_eq!(
        events.try_recv().unwrap(),
        DecoderEvent::ArticleMissing {
            job: "My.Download".to_string(),
            article: "<part1of1@example.com>".to_string(),
        }
    );
}

#[test]
fn test_only_empty_lines_counts_as_empty_response() {
    let h = Harness::new(&[("news1", 0)]);
    let dl = Download::new(PRIMARY);

    let verdict = h.decoder.process(&dl.request(text(&["", ""])));

    assert_eq!(verdict.status, DecodeStatus::EmptyResponse);
    assert_eq!(dl.job.log_count(ArticleLog::Missing), 1);
}

#[test]
fn test_bad_article_is_retried_on_untried_server() {
    let h = Harness::new(&[("news1", 10), ("news2", 10)]);
    let dl = Download::new(PRIMARY);
    dl.article.record_try();

    let verdict = h
        .decoder
        .process(&dl.request(text(&["Path: not-for-mail", "no yenc here"])));

    assert_eq!(verdict.status, DecodeStatus::BadYenc);
    assert!(!verdict.register);
    assert!(h.queue.registered().is_empty());
    assert_eq!(dl.job.log_count(ArticleLog::Bad), 0);
    assert_eq!(dl.article.fetcher(), None);
    assert_eq!(dl.article.tries(), 0);
    assert!(dl.article.server_in_try_list(PRIMARY));
    assert!(!dl.article.allow_fill_server());
    assert_eq!(h.queue.resets(), 1);
}

#[test]
fn test_fill_server_used_after_primaries() {
    let h = Harness::new(&[("news1", 10), ("fill", 1)]);
    let dl = Download::new(PRIMARY);

    h.decoder.process(&dl.request(text(&["garbage"])));
    assert!(dl.article.allow_fill_server());
    assert!(h.queue.registered().is_empty());

    // Fill server has nothing usable either
    dl.article.set_fetcher(Some("fill:119".to_string()));
    h.decoder.process(&dl.request(text(&["garbage"])));

    assert_eq!(
        h.queue.registered(),
        vec![("<part1of1@example.com>".to_string(), false)]
    );
    assert_eq!(dl.job.log_count(ArticleLog::Bad), 1);
    assert_eq!(dl.job.log_count(ArticleLog::Missing), 1);
}

#[test]
fn test_inactive_servers_are_not_retried() {
    let h = Harness::new(&[("news1", 10), ("news2", 10)]);
    h.pool.set_active("news2:119", false);
    let dl = Download::new(PRIMARY);

    h.decoder.process(&dl.request(text(&["garbage"])));

    assert_eq!(h.queue.registered().len(), 1);
    assert_eq!(dl.job.log_count(ArticleLog::Missing), 1);
}

#[test]
fn test_killed_article() {
    let h = Harness::new(&[("news1", 0)]);
    let dl = Download::new(PRIMARY);

    h.decoder.process(&dl.request(text(&[
        "X-Complaints-To: abuse@example.com (removed on request)",
        "Message-ID: <part1of1@example.com>",
        "This article has been removed due to a DMCA notice",
    ])));

    assert_eq!(dl.job.log(ArticleLog::Killed), vec!["<part1of1@example.com>"]);
    assert_eq!(dl.job.log_count(ArticleLog::Bad), 0);
    assert_eq!(
        h.queue.registered(),
        vec![("<part1of1@example.com>".to_string(), true)]
    );
}

#[test]
fn test_precheck_probe_found() {
    let h = Harness::new(&[("news1", 0), ("news2", 0)]);
    let dl = Download::precheck(PRIMARY);

    let verdict = h
        .decoder
        .process(&dl.request(text(&["223 0 <part1of1@example.com>"])));

    assert!(verdict.found);
    assert!(h.cache.saved().is_empty());
    assert_eq!(
        h.queue.registered(),
        vec![("<part1of1@example.com>".to_string(), true)]
    );
    assert_eq!(dl.article.fetcher(), Some(PRIMARY.to_string()));
}

#[test]
fn test_precheck_never_decodes_body() {
    let h = Harness::new(&[("news1", 0)]);
    let dl = Download::precheck(PRIMARY);

    let mut lines = text(&["Message-ID: <part1of1@example.com>"]);
    lines.extend(encoded(b"payload"));
    h.decoder.process(&dl.request(lines));

    assert!(h.cache.saved().is_empty());
    assert_eq!(dl.file.file_type(), FileType::Unknown);
    assert_eq!(
        h.queue.registered(),
        vec![("<part1of1@example.com>".to_string(), true)]
    );
}

#[test]
fn test_precheck_missing_article() {
    let h = Harness::new(&[("news1", 0)]);
    let dl = Download::precheck(PRIMARY);

    h.decoder.process(&dl.request(Vec::new()));

    assert_eq!(
        h.queue.registered(),
        vec![("<part1of1@example.com>".to_string(), false)]
    );
    assert_eq!(dl.job.log_count(ArticleLog::Bad), 0);
}

#[test]
fn test_uuencode_pauses_job() {
    let h = Harness::new(&[("news1", 0)]);
    let dl = Download::new(PRIMARY);
    let mut events = h.decoder.subscribe();
    let lines = text(&["begin 644 my.download.rar", "M9V]O9\"!D87D*", "`", "end"]);

    let verdict = h.decoder.process(&dl.request(lines.clone()));
    assert_eq!(verdict.status, DecodeStatus::BadYenc);
    assert_eq!(dl.file.file_type(), FileType::Uu);
    assert!(dl.job.is_paused());
    assert_eq!(
        events.try_recv().unwrap(),
        DecoderEvent::UuencodeDetected {
            job: "My.Download".to_string()
        }
    );

    // Already paused: no second notification
    h.decoder.process(&dl.request(lines));
    while let Ok(event) = events.try_recv() {
        assert!(!matches!(event, DecoderEvent::UuencodeDetected { .. }));
    }
}

#[test]
fn test_dangling_escape_is_unknown_failure() {
    let h = Harness::new(&[("news1", 0), ("news2", 0)]);
    let dl = Download::new(PRIMARY);

    let verdict = h.decoder.process(&dl.request(text(&[
        "=ybegin line=128 size=1 name=x.bin",
        "k=",
        "=yend size=1",
    ])));

    assert_eq!(verdict.status, DecodeStatus::UnknownFailure);
    assert!(!verdict.register);
    assert!(h.queue.registered().is_empty());
    assert_eq!(dl.job.log_count(ArticleLog::Bad), 0);
}

#[test]
fn test_cache_write_failure_pauses_fetching() {
    let h = Harness::new(&[("news1", 0)]);
    h.cache.fail_saves.store(true, Ordering::SeqCst);
    let dl = Download::new(PRIMARY);

    h.decoder.process(&dl.request(encoded(b"data")));

    assert_eq!(h.throttle.pauses.load(Ordering::SeqCst), 1);
    assert!(h.queue.registered().is_empty());
    assert_eq!(dl.article.fetcher(), None);
    assert_eq!(h.queue.resets(), 1);
}

#[test]
fn test_refetch_after_failed_write_counts_article_once() {
    let h = Harness::new(&[("news1", 0)]);
    h.cache.fail_saves.store(true, Ordering::SeqCst);
    let dl = Download::new(PRIMARY);

    h.decoder.process(&dl.request(encoded(b"data")));
    assert_eq!(dl.file.article_count(), 0);

    h.cache.fail_saves.store(false, Ordering::SeqCst);
    dl.article.set_fetcher(Some(PRIMARY.to_string()));
    h.decoder.process(&dl.request(encoded(b"data")));

    assert_eq!(dl.file.article_count(), 1);
    assert_eq!(
        h.queue.registered(),
        vec![("<part1of1@example.com>".to_string(), true)]
    );
}

#[test]
fn test_refetch_after_failed_write_logs_damage_once() {
    let h = Harness::new(&[("news1", 0)]);
    h.cache.fail_saves.store(true, Ordering::SeqCst);
    let dl = Download::new(PRIMARY);
    let mut lines = encoded(b"abc");
    let last = lines.len() - 1;
    lines[last] = b"=yend size=3 crc32=00000000".to_vec();

    let verdict = h.decoder.process(&dl.request(lines.clone()));
    assert!(!verdict.register);
    assert!(dl.job.log(ArticleLog::Bad).is_empty());

    h.cache.fail_saves.store(false, Ordering::SeqCst);
    dl.article.set_fetcher(Some(PRIMARY.to_string()));
    h.decoder.process(&dl.request(lines));

    assert_eq!(dl.job.log(ArticleLog::Bad), vec!["<part1of1@example.com>"]);
    assert_eq!(
        h.queue.registered(),
        vec![("<part1of1@example.com>".to_string(), true)]
    );
}

#[test]
fn test_damage_pulls_in_repair_blocks() {
    let h = Harness::new(&[("news1", 0)]);
    let mut events = h.decoder.subscribe();

    let article = Arc::new(Article::new("<p3@example.com>", 1024));
    article.set_fetcher(Some(PRIMARY.to_string()));
    let file = Arc::new(NzbFile::new("show.s01e01.part03.rar", vec![article.clone()]));
    let vol = |name: &str, blocks| Arc::new(NzbFile::new(name, Vec::new()).with_blocks(blocks));
    let job = Arc::new(
        Job::new(
            "Show.S01E01",
            vec![file.clone(), vol("show.s01e01.vol00+01.par2", 1)],
        )
        .with_extra_pars(
            "show.s01e01",
            vec![
                vol("show.s01e01.vol01+05.par2", 5),
                vol("show.s01e01.vol06+03.par2", 3),
                vol("show.s01e01.vol09+01.par2", 1),
            ],
        ),
    );
    job.inc_log(ArticleLog::Bad, "<p1@example.com>");
    job.inc_log(ArticleLog::Bad, "<p2@example.com>");

    // Goes missing: the third logged failure
    h.decoder
        .process(&DecodeRequest::new(job.clone(), file.clone(), article, Vec::new()));

    let blocks: Vec<u32> = job.files().iter().filter_map(|f| f.blocks()).collect();
    assert_eq!(blocks, vec![1, 3]);
    assert_eq!(job.extra_pars("show.s01e01").len(), 2);

    let events: Vec<DecoderEvent> = std::iter::from_fn(|| events.try_recv().ok()).collect();
    assert!(events.contains(&DecoderEvent::RepairBlocksAdded {
        job: "Show.S01E01".to_string(),
        file: "show.s01e01.part03.rar".to_string(),
        blocks: 3,
    }));
}

#[test]
fn test_repair_disabled_by_config() {
    let h = Harness::with_config(
        &[("news1", 0)],
        DecoderConfig::default().with_prospective_par_download(false),
    );
    let article = Arc::new(Article::new("<p1@example.com>", 1024));
    article.set_fetcher(Some(PRIMARY.to_string()));
    let file = Arc::new(NzbFile::new("show.part01.rar", vec![article.clone()]));
    let job = Arc::new(Job::new("Show", vec![file.clone()]).with_extra_pars(
        "show",
        vec![Arc::new(
            NzbFile::new("show.vol00+01.par2", Vec::new()).with_blocks(1),
        )],
    ));

    h.decoder
        .process(&DecodeRequest::new(job.clone(), file, article, Vec::new()));

    assert_eq!(job.files().len(), 1);
    assert!(job.has_extra_pars());
}
