//! Text and JSON rendering of a finished report.
//!
//! Both renderers walk [`Report::sorted_sections`], so output is identical
//! across runs regardless of the order in which fetches completed.

use std::io::{self, Write};

use serde::Serialize;
use signal::{
    IssueRecord, JobDetailRecord, JobSummaryRecord, Report, ReportField, ReportRecord,
    ReportRunId, SortedSection,
};

/// Writes the report as human-readable text.
pub fn write_text(report: &Report, emojis_off: bool, out: &mut impl Write) -> io::Result<()> {
    for section in report.sorted_sections() {
        writeln!(out)?;
        writeln!(out, "{}", header(section.field, emojis_off))?;

        for failure in &section.failures {
            if failure.partial {
                writeln!(out, "(section incomplete: {})", failure.error)?;
            } else {
                writeln!(out, "(section unavailable: {})", failure.error)?;
            }
        }

        let is_dashboard = section
            .records
            .iter()
            .any(|r| matches!(r, ReportRecord::JobSummary(_)));
        if is_dashboard {
            write_dashboard(&section, emojis_off, out)?;
        } else {
            write_issues(&section, out)?;
        }
    }
    Ok(())
}

fn header(field: &ReportField, emojis_off: bool) -> String {
    let title = field.title.to_uppercase();
    if emojis_off || field.emoji.is_empty() {
        title
    } else {
        format!("{} {title}", field.emoji)
    }
}

fn write_issues(section: &SortedSection<'_>, out: &mut impl Write) -> io::Result<()> {
    let mut current_sig: Option<&str> = None;
    for record in &section.records {
        let ReportRecord::Issue(issue) = record else {
            continue;
        };
        if current_sig != Some(issue.sig.as_str()) {
            if current_sig.is_some() {
                writeln!(out)?;
            }
            writeln!(out, "SIG {}", sig_label(issue))?;
            current_sig = Some(issue.sig.as_str());
        }
        write!(out, "- #{} {} {}", issue.id, issue.url, issue.title)?;
        if !issue.highlight.is_empty() {
            write!(out, " {}", issue.highlight)?;
        }
        writeln!(out)?;
        for note in &issue.notes {
            writeln!(out, "    {note}")?;
        }
    }
    Ok(())
}

fn sig_label(issue: &IssueRecord) -> &str {
    if issue.sig.is_empty() {
        "unassigned"
    } else {
        &issue.sig
    }
}

fn write_dashboard(
    section: &SortedSection<'_>,
    emojis_off: bool,
    out: &mut impl Write,
) -> io::Result<()> {
    writeln!(out, "Tests in {}", section.field.title)?;
    let mut details = Vec::new();
    for record in &section.records {
        match record {
            ReportRecord::JobSummary(summary) => write_summary(summary, out)?,
            ReportRecord::JobDetail(detail) => details.push(detail),
            ReportRecord::Issue(_) => {}
        }
    }
    if details.is_empty() {
        return Ok(());
    }

    writeln!(out, "Job details:")?;
    for detail in details {
        write_detail(detail, emojis_off, out)?;
    }
    Ok(())
}

fn write_summary(summary: &JobSummaryRecord, out: &mut impl Write) -> io::Result<()> {
    for note in &summary.notes {
        writeln!(out, "- {note}")?;
    }
    Ok(())
}

fn write_detail(
    detail: &JobDetailRecord,
    emojis_off: bool,
    out: &mut impl Write,
) -> io::Result<()> {
    if emojis_off || detail.highlight.is_empty() {
        writeln!(out, "{} severity:{} {}", detail.status, detail.severity, detail.title)?;
    } else {
        writeln!(out, "{} {} {}", detail.status, detail.highlight, detail.title)?;
    }
    writeln!(out, "    {}", detail.url)?;
    for note in &detail.notes {
        writeln!(out, "    {note}")?;
    }
    Ok(())
}

#[derive(Serialize)]
struct JsonReport<'a> {
    run_id: ReportRunId,
    complete: bool,
    sections: Vec<SortedSection<'a>>,
    collisions: &'a [ReportField],
}

/// Writes the report as pretty-printed JSON in presentation order.
pub fn write_json(report: &Report, run_id: ReportRunId, out: &mut impl Write) -> io::Result<()> {
    let document = JsonReport {
        run_id,
        complete: report.is_complete(),
        sections: report.sorted_sections(),
        collisions: &report.collisions,
    };
    serde_json::to_writer_pretty(&mut *out, &document)?;
    writeln!(out)
}
