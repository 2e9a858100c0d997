use std::borrow::Cow;
use std::collections::BTreeMap;

use encoding_rs::{BIG5, UTF_16BE};
use lopdf::content::Content;
use lopdf::{Document, Object, ObjectId};
use pdf_extract::{MediaBox, OutputDev, OutputError, Transform};
use tracing::{debug, warn};

use crate::classify::clean_text;
use crate::error::ExtractionError;
use crate::model::{PageFragments, TextFragment};

const RUN_GAP_FACTOR: f64 = 0.8;
const SPACE_GAP_FACTOR: f64 = 0.15;
const AVERAGE_GLYPH_WIDTH: f64 = 0.5;
const DEFAULT_PAGE_TOP: f64 = 842.0;

pub trait TextExtractor {
    fn name(&self) -> &'static str;

    fn extract(&self, pdf: &[u8]) -> Result<Vec<PageFragments>, ExtractionError>;
}

impl<T> TextExtractor for &T
where
    T: TextExtractor + ?Sized,
{
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn extract(&self, pdf: &[u8]) -> Result<Vec<PageFragments>, ExtractionError> {
        (**self).extract(pdf)
    }
}

#[must_use]
pub fn decode_fragment_text(raw: &str) -> String {
    let decoded = if raw.contains('%') {
        urlencoding::decode(raw)
            .map(Cow::into_owned)
            .unwrap_or_else(|_| raw.to_string())
    } else {
        raw.to_string()
    };
    clean_text(&decoded)
}

struct Run {
    x: f64,
    y: f64,
    right: f64,
    height: f64,
    text: String,
    pending_space: bool,
}

struct RunBuilder {
    page: u32,
    fragments: Vec<TextFragment>,
    current: Option<Run>,
}

impl RunBuilder {
    fn new(page: u32) -> Self {
        Self {
            page,
            fragments: Vec::new(),
            current: None,
        }
    }

    fn push_glyph(&mut self, x: f64, y: f64, advance: f64, size: f64, glyph: &str) {
        if glyph.trim().is_empty() {
            if let Some(run) = self.current.as_mut() {
                run.pending_space = true;
            }
            return;
        }

        let size = size.abs().max(1.0);
        if let Some(run) = self.current.as_mut() {
            let gap = x - run.right;
            let same_line = (y - run.y).abs() <= size * 0.5;
            if same_line && gap <= size * RUN_GAP_FACTOR && gap >= -size * 0.5 {
                if run.pending_space || gap > size * SPACE_GAP_FACTOR {
                    run.text.push(' ');
                }
                run.text.push_str(glyph);
                run.right = x + advance;
                run.height = run.height.max(size);
                run.pending_space = false;
                return;
            }
        }

        self.break_run();
        self.current = Some(Run {
            x,
            y,
            right: x + advance,
            height: size,
            text: glyph.to_string(),
            pending_space: false,
        });
    }

    fn break_run(&mut self) {
        let Some(run) = self.current.take() else {
            return;
        };
        let text = decode_fragment_text(&run.text);
        if text.is_empty() {
            return;
        }
        self.fragments.push(
            TextFragment::new(self.page, run.x, run.y, text)
                .with_size(run.right - run.x, run.height),
        );
    }

    fn finish(mut self) -> PageFragments {
        self.break_run();
        PageFragments {
            page_number: self.page,
            fragments: self.fragments,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PositionedTextExtractor;

#[derive(Default)]
struct FragmentSink {
    pages: Vec<PageFragments>,
    builder: Option<RunBuilder>,
    page_top: f64,
}

impl FragmentSink {
    fn flush_page(&mut self) {
        if let Some(builder) = self.builder.take() {
            self.pages.push(builder.finish());
        }
    }
}

impl OutputDev for FragmentSink {
    fn begin_page(
        &mut self,
        page_num: u32,
        media_box: &MediaBox,
        _art_box: Option<(f64, f64, f64, f64)>,
    ) -> Result<(), OutputError> {
        self.flush_page();
        self.page_top = media_box.ury;
        self.builder = Some(RunBuilder::new(page_num));
        Ok(())
    }

    fn end_page(&mut self) -> Result<(), OutputError> {
        self.flush_page();
        Ok(())
    }

    fn output_character(
        &mut self,
        trm: &Transform,
        width: f64,
        _spacing: f64,
        font_size: f64,
        char: &str,
    ) -> Result<(), OutputError> {
        let Some(builder) = self.builder.as_mut() else {
            return Ok(());
        };
        let size = font_size * (trm.m11 * trm.m22).abs().sqrt();
        let x = trm.m31;
        let y = self.page_top - trm.m32;
        builder.push_glyph(x, y, width * size, size, char);
        Ok(())
    }

    fn begin_word(&mut self) -> Result<(), OutputError> {
        Ok(())
    }

    fn end_word(&mut self) -> Result<(), OutputError> {
        Ok(())
    }

    fn end_line(&mut self) -> Result<(), OutputError> {
        Ok(())
    }
}

impl TextExtractor for PositionedTextExtractor {
    fn name(&self) -> &'static str {
        "pdf-extract"
    }

    fn extract(&self, pdf: &[u8]) -> Result<Vec<PageFragments>, ExtractionError> {
        let document = pdf_extract::Document::load_mem(pdf)
            .map_err(|error| ExtractionError::backend(self.name(), error.to_string()))?;
        if document.is_encrypted() {
            return Err(ExtractionError::Encrypted);
        }

        let mut sink = FragmentSink::default();
        pdf_extract::output_doc(&document, &mut sink)
            .map_err(|error| ExtractionError::backend(self.name(), error.to_string()))?;
        sink.flush_page();

        debug!(
            backend = self.name(),
            pages = sink.pages.len(),
            "positioned text extracted"
        );
        Ok(sink.pages)
    }
}

fn looks_decoding_broken(text: &str) -> bool {
    let total = text.chars().count();
    if total == 0 {
        return false;
    }
    if text.contains("?Identity-H Unimplemented?") {
        return true;
    }

    let replacement = text.matches('\u{FFFD}').count();
    let control = text
        .chars()
        .filter(|ch| ch.is_control() && !matches!(ch, '\n' | '\r' | '\t'))
        .count();
    replacement * 8 > total || control * 5 > total
}

fn decode_pdf_bytes(encoding: Option<&str>, bytes: &[u8]) -> String {
    let decoded = Document::decode_text(encoding, bytes);
    if !looks_decoding_broken(&decoded) {
        return decoded;
    }

    let lower = encoding.map(str::to_ascii_lowercase).unwrap_or_default();
    let has_bom = bytes.starts_with(&[0xFE, 0xFF]);
    if has_bom || ["utf16", "ucs2", "identity-h", "unicode"].iter().any(|hint| lower.contains(hint)) {
        let payload = if has_bom { &bytes[2..] } else { bytes };
        let (utf16, had_errors) = UTF_16BE.decode_without_bom_handling(payload);
        if !had_errors && !utf16.is_empty() {
            return utf16.into_owned();
        }
    }

    if ["big5", "b5", "eten", "cns"].iter().any(|hint| lower.contains(hint)) {
        let (big5, _, had_errors) = BIG5.decode(bytes);
        if !had_errors && !big5.is_empty() {
            return big5.into_owned();
        }
    }

    String::from_utf8_lossy(bytes).into_owned()
}

type Matrix = [f64; 6];

const IDENTITY: Matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

fn operand_f64(operands: &[Object], index: usize) -> Option<f64> {
    operands
        .get(index)
        .and_then(|operand| operand.as_float().ok())
        .map(f64::from)
}

struct TextState<'a> {
    matrix: Matrix,
    line_matrix: Matrix,
    leading: f64,
    font_size: f64,
    encoding: Option<&'a str>,
    page_top: f64,
}

impl TextState<'_> {
    fn move_line(&mut self, tx: f64, ty: f64) {
        let [a, b, c, d, e, f] = self.line_matrix;
        self.line_matrix = [a, b, c, d, e + tx * a + ty * c, f + tx * b + ty * d];
        self.matrix = self.line_matrix;
    }

    fn scale(&self) -> f64 {
        (self.matrix[0] * self.matrix[3]).abs().sqrt().max(f64::EPSILON)
    }

    fn show(&mut self, builder: &mut RunBuilder, bytes: &[u8]) {
        let text = decode_pdf_bytes(self.encoding, bytes);
        let size = self.font_size * self.scale();
        let advance = size * AVERAGE_GLYPH_WIDTH;
        for ch in text.chars() {
            let x = self.matrix[4];
            let y = self.page_top - self.matrix[5];
            let mut glyph = [0_u8; 4];
            builder.push_glyph(x, y, advance, size, ch.encode_utf8(&mut glyph));
            self.matrix[4] += advance;
        }
    }

    fn adjust(&mut self, thousandths: f64) {
        self.matrix[4] -= thousandths / 1000.0 * self.font_size * self.matrix[0];
    }
}

fn page_top(document: &Document, page_id: ObjectId) -> f64 {
    let mut current = Some(page_id);
    while let Some(id) = current {
        let Ok(dictionary) = document.get_dictionary(id) else {
            break;
        };
        if let Some(top) = dictionary
            .get(b"MediaBox")
            .ok()
            .and_then(|object| object.as_array().ok())
            .and_then(|values| operand_f64(values, 3))
        {
            return top;
        }
        current = dictionary
            .get(b"Parent")
            .ok()
            .and_then(|object| object.as_reference().ok());
    }
    DEFAULT_PAGE_TOP
}

fn extract_page_fragments(
    document: &Document,
    page_number: u32,
    page_id: ObjectId,
) -> Result<PageFragments, ExtractionError> {
    let raw_content = document.get_page_content(page_id)?;
    let content = Content::decode(&raw_content)?;
    let encodings = document
        .get_page_fonts(page_id)
        .into_iter()
        .map(|(name, font)| (name, font.get_font_encoding()))
        .collect::<BTreeMap<Vec<u8>, &str>>();

    let mut builder = RunBuilder::new(page_number);
    let mut state = TextState {
        matrix: IDENTITY,
        line_matrix: IDENTITY,
        leading: 0.0,
        font_size: 12.0,
        encoding: None,
        page_top: page_top(document, page_id),
    };

    for operation in content.operations {
        let operands = operation.operands.as_slice();
        match operation.operator.as_str() {
            "BT" => {
                state.matrix = IDENTITY;
                state.line_matrix = IDENTITY;
            }
            "ET" => builder.break_run(),
            "Tf" => {
                if let Some(font_name) = operands.first().and_then(|operand| operand.as_name().ok())
                {
                    state.encoding = encodings.get(font_name).copied();
                }
                if let Some(size) = operand_f64(operands, 1) {
                    state.font_size = size;
                }
            }
            "TL" => state.leading = operand_f64(operands, 0).unwrap_or(state.leading),
            "Td" | "TD" => {
                let tx = operand_f64(operands, 0).unwrap_or(0.0);
                let ty = operand_f64(operands, 1).unwrap_or(0.0);
                if operation.operator == "TD" {
                    state.leading = -ty;
                }
                state.move_line(tx, ty);
            }
            "Tm" => {
                let values = (0..6)
                    .map(|index| operand_f64(operands, index))
                    .collect::<Option<Vec<_>>>();
                if let Some([a, b, c, d, e, f]) = values.as_deref() {
                    state.line_matrix = [*a, *b, *c, *d, *e, *f];
                    state.matrix = state.line_matrix;
                }
            }
            "T*" => state.move_line(0.0, -state.leading),
            "Tj" => {
                if let Some(Object::String(bytes, _)) = operands.first() {
                    state.show(&mut builder, bytes);
                }
            }
            "'" => {
                state.move_line(0.0, -state.leading);
                if let Some(Object::String(bytes, _)) = operands.first() {
                    state.show(&mut builder, bytes);
                }
            }
            "\"" => {
                state.move_line(0.0, -state.leading);
                if let Some(Object::String(bytes, _)) = operands.get(2) {
                    state.show(&mut builder, bytes);
                }
            }
            "TJ" => {
                let Some(Object::Array(items)) = operands.first() else {
                    continue;
                };
                for item in items {
                    match item {
                        Object::String(bytes, _) => state.show(&mut builder, bytes),
                        other => {
                            if let Ok(value) = other.as_float() {
                                state.adjust(f64::from(value));
                            }
                        }
                    }
                }
            }
            _ => {}
        }
    }

    Ok(builder.finish())
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ContentStreamExtractor;

impl TextExtractor for ContentStreamExtractor {
    fn name(&self) -> &'static str {
        "lopdf-content"
    }

    fn extract(&self, pdf: &[u8]) -> Result<Vec<PageFragments>, ExtractionError> {
        let document = Document::load_mem(pdf)?;
        if document.is_encrypted() {
            return Err(ExtractionError::Encrypted);
        }

        let mut pages = Vec::new();
        for (page_number, page_id) in document.get_pages() {
            match extract_page_fragments(&document, page_number, page_id) {
                Ok(page) => pages.push(page),
                Err(error) => {
                    warn!(page = page_number, %error, "skipping unreadable page content");
                    pages.push(PageFragments {
                        page_number,
                        fragments: Vec::new(),
                    });
                }
            }
        }

        debug!(backend = self.name(), pages = pages.len(), "positioned text extracted");
        Ok(pages)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackExtractor<P, S> {
    pub primary: P,
    pub secondary: S,
}

impl<P, S> FallbackExtractor<P, S> {
    pub fn new(primary: P, secondary: S) -> Self {
        Self { primary, secondary }
    }
}

fn has_text(pages: &[PageFragments]) -> bool {
    pages.iter().any(|page| !page.fragments.is_empty())
}

impl<P, S> TextExtractor for FallbackExtractor<P, S>
where
    P: TextExtractor,
    S: TextExtractor,
{
    fn name(&self) -> &'static str {
        "fallback"
    }

    fn extract(&self, pdf: &[u8]) -> Result<Vec<PageFragments>, ExtractionError> {
        let primary_error = match self.primary.extract(pdf) {
            Ok(pages) if has_text(&pages) => return Ok(pages),
            Ok(pages) => {
                warn!(
                    primary = self.primary.name(),
                    secondary = self.secondary.name(),
                    "primary extractor found no text, trying secondary"
                );
                match self.secondary.extract(pdf) {
                    Ok(fallback) if has_text(&fallback) => return Ok(fallback),
                    _ => return Ok(pages),
                }
            }
            Err(error) => error,
        };

        warn!(
            primary = self.primary.name(),
            secondary = self.secondary.name(),
            error = %primary_error,
            "primary extractor failed, trying secondary"
        );
        self.secondary.extract(pdf).map_err(|secondary_error| {
            debug!(error = %secondary_error, "secondary extractor failed too");
            primary_error
        })
    }
}

pub type DefaultExtractor = FallbackExtractor<PositionedTextExtractor, ContentStreamExtractor>;
