// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Extraction entry point.
//
// raw bytes → route → per-format path → structure → aggregate.
//
// The `Extractor` owns its collaborators and configuration and holds no
// per-call state, so one instance serves any number of concurrent calls.
// Collaborator calls are synchronous and run on the blocking pool, one after
// another; tiers never run in parallel.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, field, info, instrument, Span};

use folio_bridge::{HtmlConverter, OcrEngine, PdfMarkdownConverter};
use folio_core::config::ExtractionConfig;
use folio_core::error::{FolioError, Result};
use folio_core::integrity::fingerprint;
use folio_core::types::{
    ConverterKind, DocumentFormat, ExtractOptions, ExtractionId, ExtractionResult,
};

use crate::aggregate::{align_drafts, assemble, merge_chapters, ChapterDraft, ResultParts};
use crate::docx::DocxHtmlConverter;
use crate::html::html_to_markdown;
use crate::pdf::{LopdfMarkdownConverter, TieredPdfExtractor};
use crate::router;
use crate::scan::{run_ocr, OcrClient, OcrRequest, PostProcessOptions};
use crate::structure::{extract_html_chapters, extract_structure};

/// Run a synchronous collaborator call on the blocking pool.
pub(crate) async fn run_blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|err| FolioError::Conversion(format!("converter task aborted: {err}")))?
}

/// Output of one format path, before structuring.
struct PathOutput {
    markdown: String,
    html: Option<String>,
    html_chapters: Vec<ChapterDraft>,
    estimated_pages: Option<u32>,
    warnings: Vec<String>,
    converter_used: ConverterKind,
    is_scanned: bool,
    confidence: Option<f32>,
}

impl PathOutput {
    fn markup(markdown: String, converter_used: ConverterKind) -> Self {
        Self {
            markdown,
            html: None,
            html_chapters: Vec::new(),
            estimated_pages: None,
            warnings: Vec::new(),
            converter_used,
            is_scanned: false,
            confidence: None,
        }
    }
}

/// The document structural extraction pipeline.
pub struct Extractor {
    html_converter: Arc<dyn HtmlConverter>,
    pdf_converter: Arc<dyn PdfMarkdownConverter>,
    ocr: Option<OcrClient>,
    config: ExtractionConfig,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new(ExtractionConfig::default())
    }
}

impl Extractor {
    /// In-process DOCX and PDF converters, no OCR engine.
    pub fn new(config: ExtractionConfig) -> Self {
        Self {
            html_converter: Arc::new(DocxHtmlConverter),
            pdf_converter: Arc::new(LopdfMarkdownConverter),
            ocr: None,
            config,
        }
    }

    pub fn builder() -> ExtractorBuilder {
        ExtractorBuilder::default()
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    pub fn has_ocr(&self) -> bool {
        self.ocr.is_some()
    }

    /// Extract text, Markdown, HTML, chapters, and diagnostics from `bytes`.
    ///
    /// Fails only with `UnsupportedFormat` (routing) or `ExtractionFailed`
    /// (nothing recoverable); every other problem becomes a warning.
    #[instrument(skip_all, fields(
        bytes_len = bytes.len(),
        extraction_id = field::Empty,
        format = field::Empty,
    ))]
    pub async fn extract(&self, bytes: &[u8], options: &ExtractOptions) -> Result<ExtractionResult> {
        let started = Instant::now();
        let extraction_id = ExtractionId::new();
        Span::current().record("extraction_id", field::display(extraction_id));

        let document = router::route(bytes, options.format.as_deref())?;
        let format = document.format;
        Span::current().record("format", field::display(format));
        info!(%format, "Format routed");

        let ocr_request = self.ocr_request(options);
        let output = match format {
            DocumentFormat::Docx => self.extract_docx(document.bytes).await?,
            DocumentFormat::Html => transduce(&String::from_utf8_lossy(strip_bom(document.bytes)), Vec::new())?,
            DocumentFormat::Plain => plain_text(document.bytes)?,
            DocumentFormat::Pdf => self.extract_pdf(document.bytes, options, &ocr_request).await?,
            DocumentFormat::Image => self.extract_image(document.bytes, &ocr_request).await,
        };

        let structure = extract_structure(&output.markdown, self.config.locale);
        let markdown_drafts: Vec<ChapterDraft> =
            structure.chapters.iter().map(ChapterDraft::from).collect();
        let html_drafts = align_drafts(&output.html_chapters, &markdown_drafts);
        let chapters = merge_chapters(&html_drafts, &markdown_drafts);
        debug!(chapters = chapters.len(), has_preface = structure.preface.is_some(), "Structured");

        Ok(assemble(
            ResultParts {
                extraction_id,
                format,
                markdown: output.markdown,
                html: output.html,
                chapters,
                preface: structure.preface,
                estimated_pages: output.estimated_pages,
                warnings: output.warnings,
                converter_used: output.converter_used,
                is_scanned: output.is_scanned,
                confidence: output.confidence,
                source_sha256: fingerprint(bytes),
                started,
            },
            self.config.words_per_page,
        ))
    }

    fn ocr_request(&self, options: &ExtractOptions) -> OcrRequest {
        let languages = options
            .languages
            .clone()
            .filter(|langs| !langs.is_empty())
            .unwrap_or_else(|| self.config.default_languages.clone());
        let timeout = options
            .timeout_ms
            .map(Duration::from_millis)
            .unwrap_or_else(|| self.config.ocr_timeout());

        OcrRequest {
            languages,
            timeout,
            post: PostProcessOptions {
                preserve_layout: options.preserve_layout,
                detect_headings: options.detect_headings.unwrap_or(self.config.detect_headings),
                detect_lists: options.detect_lists.unwrap_or(self.config.detect_lists),
                low_confidence_threshold: self.config.low_confidence_threshold,
                large_document_budget: self.config.large_document_budget(),
            },
        }
    }

    async fn extract_docx(&self, bytes: &[u8]) -> Result<PathOutput> {
        let converter = Arc::clone(&self.html_converter);
        let name = converter.name().to_string();
        let document = bytes.to_vec();

        let converted = run_blocking(move || converter.convert_to_html(&document))
            .await
            .map_err(|err| FolioError::ExtractionFailed {
                reason: "the word-processor document could not be converted".into(),
                warnings: vec![format!("Word-processor conversion ({name}) failed: {err}")],
            })?;

        transduce(&converted.value, converted.messages)
    }

    async fn extract_pdf(
        &self,
        bytes: &[u8],
        options: &ExtractOptions,
        ocr_request: &OcrRequest,
    ) -> Result<PathOutput> {
        let chain = TieredPdfExtractor::new(&self.pdf_converter, self.ocr.as_ref(), &self.config);
        let pdf = chain.extract(bytes, options.preserve_layout, ocr_request).await?;

        Ok(PathOutput {
            is_scanned: pdf.is_scanned(),
            converter_used: pdf.tier.converter_kind(),
            markdown: pdf.markdown,
            html: pdf.html,
            html_chapters: Vec::new(),
            estimated_pages: Some(pdf.estimated_pages),
            warnings: pdf.warnings,
            confidence: pdf.confidence,
        })
    }

    /// Images have one path. An OCR failure still yields a result: empty,
    /// zero confidence, with the reason as a warning.
    async fn extract_image(&self, bytes: &[u8], ocr_request: &OcrRequest) -> PathOutput {
        let output = run_ocr(self.ocr.as_ref(), bytes, ocr_request).await;
        PathOutput {
            markdown: output.markdown,
            html: Some(output.html),
            html_chapters: Vec::new(),
            estimated_pages: Some(1),
            warnings: output.warnings,
            converter_used: ConverterKind::Ocr,
            is_scanned: true,
            confidence: Some(output.confidence),
        }
    }
}

/// HTML (converter output or an HTML input) through the transducer.
fn transduce(html: &str, warnings: Vec<String>) -> Result<PathOutput> {
    let markdown = html_to_markdown(html);
    if markdown.is_empty() {
        return Err(FolioError::ExtractionFailed {
            reason: "the document contains no text".into(),
            warnings,
        });
    }
    Ok(PathOutput {
        html: Some(html.trim().to_string()),
        html_chapters: extract_html_chapters(html),
        warnings,
        ..PathOutput::markup(markdown, ConverterKind::HtmlTransducer)
    })
}

fn plain_text(bytes: &[u8]) -> Result<PathOutput> {
    let text = String::from_utf8_lossy(strip_bom(bytes)).replace("\r\n", "\n");
    let markdown = text.trim().to_string();
    if markdown.is_empty() {
        return Err(FolioError::ExtractionFailed {
            reason: "the document contains no text".into(),
            warnings: Vec::new(),
        });
    }
    Ok(PathOutput::markup(markdown, ConverterKind::PlainText))
}

fn strip_bom(bytes: &[u8]) -> &[u8] {
    bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes)
}

/// Builder for an [`Extractor`] with custom collaborators.
#[derive(Default)]
pub struct ExtractorBuilder {
    config: Option<ExtractionConfig>,
    html_converter: Option<Arc<dyn HtmlConverter>>,
    pdf_converter: Option<Arc<dyn PdfMarkdownConverter>>,
    ocr_engine: Option<Arc<dyn OcrEngine>>,
}

impl ExtractorBuilder {
    pub fn config(mut self, config: ExtractionConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn html_converter(mut self, converter: Arc<dyn HtmlConverter>) -> Self {
        self.html_converter = Some(converter);
        self
    }

    pub fn pdf_converter(mut self, converter: Arc<dyn PdfMarkdownConverter>) -> Self {
        self.pdf_converter = Some(converter);
        self
    }

    /// The engine is wrapped in an [`OcrClient`] sized by
    /// `max_concurrent_ocr_sessions`.
    pub fn ocr_engine(mut self, engine: Arc<dyn OcrEngine>) -> Self {
        self.ocr_engine = Some(engine);
        self
    }

    /// Validate the configuration and build.
    pub fn build(self) -> Result<Extractor> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let ocr = self
            .ocr_engine
            .map(|engine| OcrClient::new(engine, config.max_concurrent_ocr_sessions));
        if let Some(client) = &ocr {
            info!(engine = client.engine_name(), "OCR engine attached");
        }

        Ok(Extractor {
            html_converter: self
                .html_converter
                .unwrap_or_else(|| Arc::new(DocxHtmlConverter)),
            pdf_converter: self
                .pdf_converter
                .unwrap_or_else(|| Arc::new(LopdfMarkdownConverter)),
            ocr,
            config,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_bridge::stub::UnavailableHtmlConverter;

    #[tokio::test]
    async fn plain_text_passes_through() {
        let extractor = Extractor::default();
        let result = extractor
            .extract("Opening words.\n\n# One\nBody text".as_bytes(), &ExtractOptions::default())
            .await
            .unwrap();

        assert_eq!(result.format, DocumentFormat::Plain);
        assert_eq!(result.metadata.converter_used, ConverterKind::PlainText);
        assert_eq!(result.preface.as_ref().unwrap().content, "Opening words.");
        assert_eq!(result.chapters.len(), 1);
        assert_eq!(result.text, "Opening words.\n\nOne\nBody text");
        assert_eq!(result.estimated_pages, 1);
        assert_eq!(result.metadata.source_sha256.len(), 64);
    }

    #[tokio::test]
    async fn html_input_keeps_converter_html_per_chapter() {
        let html = "<html><body><h1>A</h1><p>x</p><h2>B</h2><p>y <em>z</em></p></body></html>";
        let result = Extractor::default()
            .extract(html.as_bytes(), &ExtractOptions::default().with_format("text/html"))
            .await
            .unwrap();

        assert_eq!(result.markdown, "# A\n\nx\n\n## B\n\ny *z*");
        assert_eq!(result.chapters.len(), 2);
        assert_eq!(result.chapters[1].html, "<h2>B</h2><p>y <em>z</em></p>");
        assert_eq!(result.chapters[1].markdown, "## B\n\ny *z*");
    }

    #[tokio::test]
    async fn failed_docx_conversion_is_extraction_failed() {
        let extractor = Extractor::builder()
            .html_converter(Arc::new(UnavailableHtmlConverter))
            .build()
            .unwrap();
        let err = extractor
            .extract(b"PK\x03\x04 word/document.xml", &ExtractOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, FolioError::ExtractionFailed { ref warnings, .. } if warnings.len() == 1));
    }

    #[tokio::test]
    async fn image_without_ocr_is_empty_result_not_error() {
        let result = Extractor::default()
            .extract(b"\x89PNG\r\n\x1a\n....", &ExtractOptions::default())
            .await
            .unwrap();
        assert!(result.markdown.is_empty());
        assert!(result.metadata.is_scanned);
        assert_eq!(result.metadata.confidence, Some(0.0));
        assert!(result.warnings[0].contains("OCR unavailable"));
    }

    #[tokio::test]
    async fn unsupported_formats_are_rejected() {
        let err = Extractor::default()
            .extract(b"x", &ExtractOptions::default().with_format("doc"))
            .await
            .unwrap_err();
        assert!(matches!(err, FolioError::UnsupportedFormat(_)));
    }

    #[tokio::test]
    async fn html_headings_the_markdown_drops_do_not_shift_chapters() {
        let html = "<h1></h1><p>alpha</p><blockquote><h2>Q</h2></blockquote>\
                    <h1>A</h1><p>a text</p><h1>B</h1><p>beta</p>";
        let result = Extractor::default()
            .extract(html.as_bytes(), &ExtractOptions::default().with_format("html"))
            .await
            .unwrap();

        let preface = result.preface.as_ref().unwrap();
        assert_eq!(preface.content, "alpha\n\n> Q");
        let chapters: Vec<(&str, &str, &str)> = result
            .chapters
            .iter()
            .map(|c| (c.title.as_str(), c.markdown.as_str(), c.html.as_str()))
            .collect();
        assert_eq!(
            chapters,
            vec![
                ("A", "# A\n\na text", "<h1>A</h1><p>a text</p>"),
                ("B", "# B\n\nbeta", "<h1>B</h1><p>beta</p>"),
            ]
        );
        for chapter in &result.chapters {
            assert!(!chapter.html.contains("alpha"));
        }
    }

    #[tokio::test]
    async fn untitled_heading_gets_section_title() {
        let result = Extractor::default()
            .extract("#  \nbody words\n".as_bytes(), &ExtractOptions::default())
            .await
            .unwrap();
        assert_eq!(result.chapters.len(), 1);
        assert_eq!(result.chapters[0].title, "Section 1");
        assert_eq!(result.chapters[0].level, 1);
    }

    #[test]
    fn builder_rejects_invalid_config() {
        let config = ExtractionConfig {
            words_per_page: 0,
            ..Default::default()
        };
        assert!(matches!(
            Extractor::builder().config(config).build(),
            Err(FolioError::Config(_))
        ));
    }

    #[test]
    fn options_override_config() {
        let extractor = Extractor::default();
        let options = ExtractOptions {
            detect_headings: Some(true),
            timeout_ms: Some(500),
            ..ExtractOptions::default().with_languages(["spa"])
        };
        let request = extractor.ocr_request(&options);
        assert_eq!(request.languages, vec!["spa".to_string()]);
        assert_eq!(request.timeout, Duration::from_millis(500));
        assert!(request.post.detect_headings);
        assert!(!request.post.detect_lists);

        let defaults = extractor.ocr_request(&ExtractOptions::default());
        assert_eq!(defaults.languages, vec!["eng".to_string()]);
        assert_eq!(defaults.timeout, Duration::from_millis(120_000));
    }
}
