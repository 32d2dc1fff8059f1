//! Structural extraction from the job board's HTML.
//!
//! The selectors here are coupled to the live markup of
//! `applyjobs.spac.gov.jo` (ASP.NET WebForms element ids, an Arabic
//! "technical experience" row marker). When the site changes structure,
//! this module is what needs revisiting.

use std::collections::{HashMap, HashSet};

use scraper::{ElementRef, Html, Selector};
use time::{Date, format_description::BorrowedFormatItem, macros::format_description};
use url::Url;

use crate::{
    error::ScrapeError,
    record::{JobRecord, composite_id, determine_status},
};

const DETAIL_MARKER: &str = "JobDet.aspx?JobID=";
const EXPERIENCE_MARKER: &str = "خبرة فنية في مجال الوظيفة";
const ID_PREFIX: &str = "ContentPlaceHolder1_PubJobDetControl1_";

const FMT_DMY_SLASH: &[BorrowedFormatItem<'static>] = format_description!("[day]/[month]/[year]");
const FMT_DMY_DASH: &[BorrowedFormatItem<'static>] = format_description!("[day]-[month]-[year]");
const FMT_ISO: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// What one listing page yields: posting ids in first-seen order, plus the
/// raw experience snippet from the row below each posting's anchor.
#[derive(Debug, Default)]
pub struct ListingPage {
    pub job_ids: Vec<String>,
    pub experience: HashMap<String, String>,
}

pub fn parse_listing(html: &str) -> ListingPage {
    let doc = Html::parse_document(html);
    let anchor = Selector::parse("a[href]").unwrap();
    let td = Selector::parse("td").unwrap();

    let mut page = ListingPage::default();
    let mut seen = HashSet::new();

    for a in doc.select(&anchor) {
        let Some(id) = a.attr("href").and_then(job_id_from_href) else {
            continue;
        };
        if !seen.insert(id.clone()) {
            continue;
        }
        if let Some(raw) = experience_after(a, &anchor, &td) {
            page.experience.insert(id.clone(), raw);
        }
        page.job_ids.push(id);
    }
    page
}

/// Digits following the `JobDet.aspx?JobID=` marker, if any.
pub fn job_id_from_href(href: &str) -> Option<String> {
    let pos = href.find(DETAIL_MARKER)?;
    let digits: String = href[pos + DETAIL_MARKER.len()..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    if digits.is_empty() { None } else { Some(digits) }
}

/// Walk the rows after a posting's anchor row until the experience snippet
/// shows up or the next posting's header row cuts the scan off.
fn experience_after(a: ElementRef, anchor: &Selector, td: &Selector) -> Option<String> {
    let tr = a
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|e| e.value().name() == "tr")?;

    for row in tr.next_siblings().filter_map(ElementRef::wrap) {
        if row.value().name() != "tr" {
            continue;
        }
        let next_posting = row
            .select(anchor)
            .any(|link| link.attr("href").is_some_and(|h| h.contains(DETAIL_MARKER)));
        if next_posting {
            return None;
        }
        for cell in row.select(td) {
            let text = stripped_text(cell);
            if text.contains(EXPERIENCE_MARKER) {
                return Some(match text.split_once(':') {
                    Some((_, tail)) => tail.trim().to_string(),
                    None => text.trim().to_string(),
                });
            }
        }
    }
    None
}

/// Compiled selectors for the detail page's labelled spans. Built once per
/// run and shared across every detail parse.
pub struct DetailSelectors {
    title: Selector,
    organization: Selector,
    vacancy_spec: Selector,
    experience: Selector,
    pub_date: Selector,
    end_date: Selector,
    qualification: Selector,
    location: Selector,
    gender: Selector,
    age: Selector,
    vacancies: Selector,
    salary: Selector,
    requirements: Selector,
    announcement: Selector,
    description: Selector,
    anchor: Selector,
}

impl DetailSelectors {
    pub fn new() -> Self {
        let by_id = |name: &str| Selector::parse(&format!("#{ID_PREFIX}{name}")).unwrap();
        Self {
            title: by_id("lblJobTitle"),
            organization: by_id("lblChapt"),
            vacancy_spec: by_id("lblVacType"),
            experience: by_id("lblMinTechExp"),
            pub_date: by_id("lblJobPubDate"),
            end_date: by_id("lblJobEndDate"),
            qualification: by_id("lblCertName"),
            location: by_id("lblGoverName"),
            gender: by_id("lblGender"),
            age: by_id("lblAgeDesc"),
            vacancies: by_id("lblVacNo"),
            salary: by_id("lblSal"),
            requirements: by_id("lblJobReqDet"),
            announcement: by_id("lblJobTitleURL"),
            description: by_id("lblJobDescURL"),
            anchor: Selector::parse("a[href]").unwrap(),
        }
    }
}

impl Default for DetailSelectors {
    fn default() -> Self {
        Self::new()
    }
}

/// Extract one posting from its detail page.
///
/// Missing fields degrade to empty strings/None. Only a page with none of
/// the labelled spans at all (an error page, a redirect stub) is a
/// [`ScrapeError::Parse`].
pub fn parse_detail(
    job_id: &str,
    html: &str,
    sel: &DetailSelectors,
    base: &Url,
    detail_url: &Url,
    today: Date,
    scraped_at: &str,
) -> Result<JobRecord, ScrapeError> {
    let doc = Html::parse_document(html);

    let title = field_text(&doc, &sel.title);
    let organization = field_text(&doc, &sel.organization);
    let pub_date_text = field_text(&doc, &sel.pub_date);

    if title.is_none() && organization.is_none() && pub_date_text.is_none() {
        return Err(ScrapeError::Parse(format!(
            "job {job_id}: no labelled detail fields present"
        )));
    }

    let organization = organization
        .map(|s| s.trim_matches(|c: char| c == ' ' || c == '/').to_string())
        .unwrap_or_default();
    let experience = field_text(&doc, &sel.experience).unwrap_or_default();
    let start = pub_date_text.as_deref().and_then(parse_date);
    let end = field_text(&doc, &sel.end_date).as_deref().and_then(parse_date);
    let start_date = start.map(iso_date);
    let end_date = end.map(iso_date);

    let title = match title {
        Some(t) if !t.is_empty() => t,
        _ => "(untitled)".to_string(),
    };
    let job_id = if job_id.is_empty() {
        composite_id(&title, &organization, start_date.as_deref())
    } else {
        job_id.to_string()
    };

    Ok(JobRecord {
        job_id,
        title,
        organization,
        vacancy_spec: field_text(&doc, &sel.vacancy_spec).unwrap_or_default(),
        experience_text: experience.clone(),
        experience_raw: experience,
        start_date,
        end_date,
        qualification: field_text(&doc, &sel.qualification).unwrap_or_default(),
        location: field_text(&doc, &sel.location).unwrap_or_default(),
        gender: field_text(&doc, &sel.gender).unwrap_or_default(),
        age: field_text(&doc, &sel.age).unwrap_or_default(),
        vacancies: field_text(&doc, &sel.vacancies).as_deref().and_then(parse_int),
        salary: field_text(&doc, &sel.salary).as_deref().and_then(parse_float),
        requirements: doc
            .select(&sel.requirements)
            .next()
            .map(multiline_text)
            .unwrap_or_default(),
        announcement_pdf: link_from(&doc, &sel.announcement, &sel.anchor, base),
        description_pdf: link_from(&doc, &sel.description, &sel.anchor, base),
        detail_url: detail_url.to_string(),
        status: determine_status(end, today).to_string(),
        scraped_at: scraped_at.to_string(),
    })
}

/// Best-effort date parse; the board writes `dd/mm/yyyy` but tolerate the
/// ISO and dashed forms too. Never errors.
pub fn parse_date(value: &str) -> Option<Date> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    for fmt in [FMT_DMY_SLASH, FMT_ISO, FMT_DMY_DASH] {
        if let Ok(d) = Date::parse(value, fmt) {
            return Some(d);
        }
    }
    None
}

pub fn iso_date(d: Date) -> String {
    d.format(FMT_ISO).unwrap_or_default()
}

fn field_text(doc: &Html, sel: &Selector) -> Option<String> {
    doc.select(sel).next().map(stripped_text)
}

fn stripped_text(el: ElementRef) -> String {
    el.text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn multiline_text(el: ElementRef) -> String {
    el.text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn link_from(doc: &Html, container: &Selector, anchor: &Selector, base: &Url) -> Option<String> {
    let el = doc.select(container).next()?;
    let href = el.select(anchor).next()?.attr("href")?;
    absolute_href(href, base)
}

/// The site emits backslash paths and `../` prefixes in its PDF links.
fn absolute_href(href: &str, base: &Url) -> Option<String> {
    let normalized = href.trim().replace('\\', "/");
    base.join(&normalized).ok().map(|u| u.to_string())
}

fn parse_int(value: &str) -> Option<i64> {
    value.trim().parse().ok()
}

fn parse_float(value: &str) -> Option<f64> {
    value.replace(',', "").trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use super::*;

    fn base() -> Url {
        Url::parse("https://applyjobs.spac.gov.jo/").unwrap()
    }

    const LISTING: &str = r#"<html><body><table>
        <tr><td><a href="JobDet.aspx?JobID=101">مهندس مدني</a></td></tr>
        <tr><td>الحد الأدنى من خبرة فنية في مجال الوظيفة : 3 سنوات</td></tr>
        <tr><td><a href="JobDet.aspx?JobID=102">محاسب</a></td></tr>
        <tr><td><a href="JobDet.aspx?JobID=101">مهندس مدني (مكرر)</a></td></tr>
        <tr><td><a href="About.aspx">عن الموقع</a></td></tr>
    </table></body></html>"#;

    #[test]
    fn listing_ids_in_order_without_duplicates() {
        let page = parse_listing(LISTING);
        assert_eq!(page.job_ids, vec!["101", "102"]);
    }

    #[test]
    fn listing_experience_attaches_to_the_right_posting() {
        let page = parse_listing(LISTING);
        assert_eq!(page.experience.get("101").map(String::as_str), Some("3 سنوات"));
        // 102's anchor row is followed by another posting header, not a snippet
        assert_eq!(page.experience.get("102"), None);
    }

    #[test]
    fn listing_tolerates_malformed_rows() {
        let html = r#"<html><body><table>
            <tr><a href="JobDet.aspx?JobID=7">no cell</a></tr>
            <tr><td></td></tr>
            <tr><td><a href="JobDet.aspx?JobID=">empty id</a></td></tr>
            <tr><td><a href="JobDet.aspx?JobID=8"><b>nested</b> title</a></td><td>extra</td></tr>
        </table></body></html>"#;
        let page = parse_listing(html);
        assert_eq!(page.job_ids, vec!["7", "8"]);
    }

    #[test]
    fn empty_listing_yields_nothing() {
        let page = parse_listing("<html><body><p>لا توجد وظائف</p></body></html>");
        assert!(page.job_ids.is_empty());
        assert!(page.experience.is_empty());
    }

    #[test]
    fn job_id_from_href_is_pure_and_collision_free() {
        assert_eq!(job_id_from_href("JobDet.aspx?JobID=42&lang=ar").as_deref(), Some("42"));
        assert_eq!(job_id_from_href("/JobDet.aspx?JobID=42"), job_id_from_href("JobDet.aspx?JobID=42"));
        assert_ne!(job_id_from_href("JobDet.aspx?JobID=1"), job_id_from_href("JobDet.aspx?JobID=2"));
        assert_eq!(job_id_from_href("JobDet.aspx?JobID="), None);
        assert_eq!(job_id_from_href("About.aspx"), None);
    }

    fn detail_html() -> String {
        format!(
            r#"<html><body>
            <span id="{p}lblJobTitle">مهندس <b>مدني</b></span>
            <span id="{p}lblChapt"> وزارة الأشغال العامة / </span>
            <span id="{p}lblVacType">شاغر دائم</span>
            <span id="{p}lblMinTechExp">سنتان</span>
            <span id="{p}lblJobPubDate">01/06/2026</span>
            <span id="{p}lblJobEndDate">30/12/2026</span>
            <span id="{p}lblCertName">بكالوريوس هندسة</span>
            <span id="{p}lblGoverName">عمان</span>
            <span id="{p}lblGender">كلاهما</span>
            <span id="{p}lblAgeDesc">لا يزيد عن 40</span>
            <span id="{p}lblVacNo">2</span>
            <span id="{p}lblSal">550.5</span>
            <span id="{p}lblJobReqDet">شرط أول<br/>شرط ثاني</span>
            <span id="{p}lblJobTitleURL"><a href="..\Docs\announce.pdf">إعلان</a></span>
            <span id="{p}lblJobDescURL"><a href="https://cdn.example/desc.pdf">وصف</a></span>
            </body></html>"#,
            p = ID_PREFIX
        )
    }

    #[test]
    fn detail_page_extracts_all_fields() {
        let sel = DetailSelectors::new();
        let detail_url = Url::parse("https://applyjobs.spac.gov.jo/JobDet.aspx?JobID=101").unwrap();
        let job = parse_detail(
            "101",
            &detail_html(),
            &sel,
            &base(),
            &detail_url,
            date!(2026 - 08 - 05),
            "2026-08-05T00:00:00Z",
        )
        .unwrap();

        assert_eq!(job.job_id, "101");
        assert_eq!(job.title, "مهندس مدني");
        assert_eq!(job.organization, "وزارة الأشغال العامة");
        assert_eq!(job.vacancy_spec, "شاغر دائم");
        assert_eq!(job.start_date.as_deref(), Some("2026-06-01"));
        assert_eq!(job.end_date.as_deref(), Some("2026-12-30"));
        assert_eq!(job.qualification, "بكالوريوس هندسة");
        assert_eq!(job.location, "عمان");
        assert_eq!(job.vacancies, Some(2));
        assert_eq!(job.salary, Some(550.5));
        assert_eq!(job.requirements, "شرط أول\nشرط ثاني");
        assert_eq!(
            job.announcement_pdf.as_deref(),
            Some("https://applyjobs.spac.gov.jo/Docs/announce.pdf")
        );
        assert_eq!(job.description_pdf.as_deref(), Some("https://cdn.example/desc.pdf"));
        assert_eq!(job.detail_url, detail_url.as_str());
        assert_eq!(job.status, "open");
    }

    #[test]
    fn detail_page_missing_fields_degrade_to_defaults() {
        let html = format!(
            r#"<html><body><span id="{p}lblJobTitle">كاتب</span></body></html>"#,
            p = ID_PREFIX
        );
        let sel = DetailSelectors::new();
        let detail_url = Url::parse("https://applyjobs.spac.gov.jo/JobDet.aspx?JobID=9").unwrap();
        let job = parse_detail(
            "9",
            &html,
            &sel,
            &base(),
            &detail_url,
            date!(2026 - 08 - 05),
            "2026-08-05T00:00:00Z",
        )
        .unwrap();

        assert_eq!(job.title, "كاتب");
        assert_eq!(job.organization, "");
        assert_eq!(job.start_date, None);
        assert_eq!(job.end_date, None);
        assert_eq!(job.vacancies, None);
        assert_eq!(job.salary, None);
        assert_eq!(job.announcement_pdf, None);
        assert_eq!(job.status, "unknown");
    }

    #[test]
    fn detail_page_with_empty_title_gets_placeholder() {
        let html = format!(
            r#"<html><body>
            <span id="{p}lblJobTitle"></span>
            <span id="{p}lblChapt">وزارة المالية</span>
            </body></html>"#,
            p = ID_PREFIX
        );
        let sel = DetailSelectors::new();
        let detail_url = Url::parse("https://applyjobs.spac.gov.jo/JobDet.aspx?JobID=5").unwrap();
        let job = parse_detail(
            "5",
            &html,
            &sel,
            &base(),
            &detail_url,
            date!(2026 - 08 - 05),
            "2026-08-05T00:00:00Z",
        )
        .unwrap();
        assert_eq!(job.title, "(untitled)");
    }

    #[test]
    fn unrecognizable_detail_page_is_a_parse_error() {
        let sel = DetailSelectors::new();
        let detail_url = Url::parse("https://applyjobs.spac.gov.jo/JobDet.aspx?JobID=5").unwrap();
        let err = parse_detail(
            "5",
            "<html><body><h1>Runtime Error</h1></body></html>",
            &sel,
            &base(),
            &detail_url,
            date!(2026 - 08 - 05),
            "2026-08-05T00:00:00Z",
        )
        .unwrap_err();
        assert!(matches!(err, ScrapeError::Parse(_)));
    }

    #[test]
    fn date_parser_is_tolerant_and_never_panics() {
        assert_eq!(parse_date("25/12/2026"), Some(date!(2026 - 12 - 25)));
        assert_eq!(parse_date(" 25/12/2026 "), Some(date!(2026 - 12 - 25)));
        assert_eq!(parse_date("2026-12-25"), Some(date!(2026 - 12 - 25)));
        assert_eq!(parse_date("25-12-2026"), Some(date!(2026 - 12 - 25)));
        assert_eq!(parse_date("31/02/2026"), None);
        assert_eq!(parse_date("قريباً"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn numeric_fields_parse_tolerantly() {
        assert_eq!(parse_int(" 4 "), Some(4));
        assert_eq!(parse_int("أربعة"), None);
        assert_eq!(parse_float("1,250.75"), Some(1250.75));
        assert_eq!(parse_float(""), None);
    }

    #[test]
    fn hrefs_resolve_against_the_base() {
        let base = base();
        assert_eq!(
            absolute_href("../Docs/a.pdf", &base).as_deref(),
            Some("https://applyjobs.spac.gov.jo/Docs/a.pdf")
        );
        assert_eq!(
            absolute_href(r"Docs\b.pdf", &base).as_deref(),
            Some("https://applyjobs.spac.gov.jo/Docs/b.pdf")
        );
        assert_eq!(
            absolute_href("https://cdn.example/x.pdf", &base).as_deref(),
            Some("https://cdn.example/x.pdf")
        );
    }
}
