use lopdf::content::Operation;
use lopdf::{Object, StringFormat};
use std::{collections::BTreeMap, io::BufWriter, mem};
use time::OffsetDateTime;

use crate::error::{ContextError, ErrorKind};
use crate::fonts::{encode_win_ansi, StandardFont};
use crate::shapes::{PathSegment, Shape, BEZIER_CIRCLE_FACTOR};
use crate::units::UnitRgb;

/// A rectangle of the document space: points, measured from the bottom-left corner of the page.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PdfRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// One layer of PDF data, later converted into a `lopdf::Stream` via `PdfLayer::into_stream`.
#[derive(Debug, Clone)]
pub struct PdfLayer {
    /// Name of the layer. Must be present for the optional content group.
    pub(crate) name: String,
    /// Stream objects in this layer. Usually, one layer equals to one stream.
    pub(super) operations: Vec<Operation>,
}

impl PdfLayer {
    fn into_stream(self) -> Result<lopdf::Stream, ContextError> {
        // Construct the stream content from the actual underlying operations of the layer
        let stream_content = lopdf::content::Content {
            operations: self.operations,
        };
        let encoded_content = stream_content.encode().map_err(|error| {
            ContextError::with_error("Failed to encode PDF layer content", &error)
                .kind(ErrorKind::Pdf)
        })?;

        // Page contents are compressed as a whole once the layers are merged
        Ok(lopdf::Stream::new(lopdf::Dictionary::new(), encoded_content).with_compression(false))
    }
}

/// The decoded pixels of an illustration, ready to become an image `XObject`.
#[derive(Debug, Clone, PartialEq)]
pub struct PdfImage {
    /// Width of the image in pixels.
    pub width: u32,
    /// Height of the image in pixels.
    pub height: u32,
    /// Either `DeviceRGB` or `DeviceGray`.
    pub color_space: &'static str,
    pub bits_per_component: u8,
    /// The filter the data is already encoded with; `DCTDecode` lets JPEG data pass through untouched.
    pub filter: Option<&'static str>,
    pub data: Vec<u8>,
    /// One byte of opacity per pixel, becoming the soft mask of the image.
    pub alpha: Option<Vec<u8>>,
}

/// Named reference to an image `XObject`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct XObjectReference(String);

impl XObjectReference {
    /// Creates a new reference for an `XObject` from a number.
    pub fn new(index: usize) -> Self {
        Self(format!("X{index}"))
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

/// The association between the names of the `XObject`s used by a page and their objects.
#[derive(Default, Debug, Clone)]
pub struct XObjectMap(BTreeMap<String, lopdf::ObjectId>);

impl XObjectMap {
    fn to_dictionary(&self) -> lopdf::Dictionary {
        self.0
            .iter()
            .map(|(name, object_id)| (name.clone(), lopdf::Object::Reference(*object_id)))
            .collect()
    }
}

/// A named reference to an OCG (Optional Content Group), which is parts of the PDF specification.
#[derive(Debug, Clone)]
pub struct OcgReference(String);

impl OcgReference {
    /// Creates a new OCG reference from an index.
    pub fn new(index: usize) -> Self {
        Self(format!("MC{index}"))
    }
}

/// The association between the OCG references and the actual PDF objects.
#[derive(Default, Debug, Clone)]
pub struct OcgLayersMap(Vec<(OcgReference, lopdf::Object)>);

impl OcgLayersMap {
    /// Adds a PDF object to the map for the OCG layers. Returns the reference to the added object.
    pub fn add_ocg(&mut self, object: lopdf::Object) -> OcgReference {
        let ocg_reference = OcgReference::new(self.0.len());
        self.0.push((ocg_reference.clone(), object));

        ocg_reference
    }
}

impl From<OcgLayersMap> for lopdf::Dictionary {
    fn from(value: OcgLayersMap) -> Self {
        let mut dictionary = lopdf::Dictionary::new();
        for entry in value.0 {
            dictionary.set((entry.0).0, entry.1);
        }

        dictionary
    }
}

/// Struct for storing the PDF Resources, to be used on a PDF page.
#[derive(Default, Debug, Clone)]
pub(crate) struct PdfResources {
    /// Images drawn on the page.
    pub xobjects: XObjectMap,
    /// Layers / optional content ("Properties") in the resource dictionary.
    pub ocg_layers: OcgLayersMap,
}

impl PdfResources {
    /// Constructs the resource dictionary of a page, registering its layers as optional content.
    /// Returns the constructed dictionary and the vector of the OCG references.
    pub(crate) fn with_layers(
        &self,
        layers: Vec<lopdf::Object>,
    ) -> (lopdf::Dictionary, Vec<OcgReference>) {
        let mut dictionary = lopdf::Dictionary::new();

        let mut ocg_layers_dictionary = self.ocg_layers.clone();
        let mut ocg_references = Vec::<OcgReference>::new();

        if !layers.is_empty() {
            for layer in layers {
                ocg_references.push(ocg_layers_dictionary.add_ocg(layer));
            }

            let current_ocg_dictionary: lopdf::Dictionary = ocg_layers_dictionary.into();
            if !current_ocg_dictionary.is_empty() {
                dictionary.set(
                    "Properties",
                    lopdf::Object::Dictionary(current_ocg_dictionary),
                );
            }
        }

        let xobjects_dictionary = self.xobjects.to_dictionary();
        if !xobjects_dictionary.is_empty() {
            dictionary.set("XObject", lopdf::Object::Dictionary(xobjects_dictionary));
        }

        (dictionary, ocg_references)
    }
}

/// The representation of a PDF page. Utility functions are implemented for this struct
/// so that its content can be inserted into the underlying PDF document.
#[derive(Debug, Clone)]
pub struct PdfPage {
    /// The number of the page in the document, starting from one.
    pub(crate) number: usize,
    /// Page width in points.
    pub width: f32,
    /// Page height in points.
    pub height: f32,
    /// Page layers, painted in order.
    pub layers: Vec<PdfLayer>,
    /// Resources used in this page.
    pub(crate) resources: PdfResources,
}

impl PdfPage {
    /// Iterates over all the layers in order to construct the dictionary for the PDF resources
    /// and the PDF streams contained into the page so that they can be inserted in to the document.
    ///
    /// # Arguments
    ///
    /// * `layers` - The optional content groups of the layers, in the same order as the layers.
    pub(crate) fn collect_resources_and_streams(
        &mut self,
        layers: &[(usize, lopdf::Object)],
    ) -> Result<(lopdf::Dictionary, Vec<lopdf::Stream>), ContextError> {
        let current_layers = layers.iter().map(|layer| layer.1.clone()).collect();
        let (resource_dictionary, ocg_references) = self.resources.with_layers(current_layers);

        let mut layer_streams = Vec::<lopdf::Stream>::new();
        use lopdf::Object::*;

        for (index, layer) in self.layers.iter_mut().enumerate() {
            // Every layer is an isolated graphics state block (q/Q) wrapped in a marked-content
            // sequence (BDC/EMC) bound to its optional content group
            layer.operations.insert(0, Operation::new("q", vec![]));
            layer.operations.insert(
                0,
                Operation::new(
                    "BDC",
                    vec![
                        Name("OC".into()),
                        Name(
                            ocg_references
                                .get(index)
                                .ok_or(ContextError::with_kind(
                                    ErrorKind::Pdf,
                                    "Unable to find the index in the OCG references",
                                ))?
                                .0
                                .clone()
                                .into(),
                        ),
                    ],
                ),
            );
            layer.operations.push(Operation::new("Q", vec![]));
            layer.operations.push(Operation::new("EMC", vec![]));

            layer_streams.push(layer.clone().into_stream()?);
        }

        Ok((resource_dictionary, layer_streams))
    }
}

/// This struct represents the actual PDF document on a high-level. It is an interface to the actual
/// underlying `lopdf::Document` with the addition of the PDF pages, the document ID, the standard
/// fonts and the images used in the document.
///
/// Pages and layers are addressed by index: `add_page_with_layer` and `add_layer_to_page` return
/// the indices the drawing functions expect.
pub struct PdfDocument {
    /// The association between the font resource names, their objects and the standard face.
    fonts: BTreeMap<String, (lopdf::ObjectId, StandardFont)>,
    /// The image objects already inserted into the document, in insertion order.
    images: Vec<lopdf::ObjectId>,
    /// The underlying PDF document: this is a low-level interface and shouldn't be directly interacted
    /// with unless strictly necessary.
    pub inner_document: lopdf::Document,
    /// The identifier of the document, it is used to in order to set the PDF `ID` tag.
    pub identifier: String,
    /// The title written into the document information.
    pub title: String,
    /// The date written into the document information, the Unix epoch unless set.
    pub creation_date: OffsetDateTime,
    /// The pages of the PDF document.
    pub(crate) pages: Vec<PdfPage>,
}

impl PdfDocument {
    /// Create a new `PdfDocument` by defaulting the underlying PDF document to version 1.5
    /// of the PDF specification and customly specifying the PDF identifier.
    pub fn new(pdf_document_identifier: String) -> Self {
        PdfDocument {
            fonts: BTreeMap::default(),
            images: Vec::new(),
            inner_document: lopdf::Document::with_version("1.5"),
            title: pdf_document_identifier.clone(),
            identifier: pdf_document_identifier,
            creation_date: OffsetDateTime::UNIX_EPOCH,
            pages: Vec::new(),
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Adds a page of given width and height in points with a first, named layer for contents to be
    /// added to. Returns the index of the page and of the layer in the page.
    pub fn add_page_with_layer(
        &mut self,
        page_width: f32,
        page_height: f32,
        layer_name: &str,
    ) -> (usize, usize) {
        let pdf_page = PdfPage {
            number: self.pages.len() + 1,
            width: page_width,
            height: page_height,
            layers: vec![PdfLayer {
                name: layer_name.into(),
                operations: Vec::new(),
            }],
            resources: PdfResources::default(),
        };
        self.pages.push(pdf_page);

        (self.pages.len() - 1, 0)
    }

    /// Adds a layer on top of the existing ones of a page, returning its index in the page.
    pub fn add_layer_to_page(
        &mut self,
        page_index: usize,
        layer_name: &str,
    ) -> Result<usize, ContextError> {
        let pdf_page = self.get_mut_page(page_index)?;
        pdf_page.layers.push(PdfLayer {
            name: layer_name.into(),
            operations: Vec::new(),
        });

        Ok(pdf_page.layers.len() - 1)
    }

    /// Registers a standard font with the document, once, returning its resource name.
    pub fn use_font(&mut self, font: StandardFont) -> String {
        if let Some((name, _)) = self.fonts.iter().find(|(_, (_, known))| *known == font) {
            return name.clone();
        }

        let font_name = format!("F{}", self.fonts.len());
        let font_object_id = self.inner_document.new_object_id();
        self.fonts
            .insert(font_name.clone(), (font_object_id, font));

        font_name
    }

    /// Inserts an image into the document as an `XObject` (plus its soft mask when it has an alpha
    /// channel), returning the reference to be passed to `draw_image_to_layer_in_page`.
    pub fn add_image(&mut self, image: &PdfImage) -> XObjectReference {
        use lopdf::Object::*;

        let soft_mask_id = image.alpha.as_ref().map(|alpha| {
            let soft_mask = lopdf::Stream::new(
                lopdf::Dictionary::from_iter(vec![
                    ("Type", Name("XObject".into())),
                    ("Subtype", Name("Image".into())),
                    ("Width", Integer(image.width as i64)),
                    ("Height", Integer(image.height as i64)),
                    ("ColorSpace", Name("DeviceGray".into())),
                    ("BitsPerComponent", Integer(8)),
                ]),
                alpha.clone(),
            );
            self.inner_document.add_object(soft_mask)
        });

        let mut image_dictionary = lopdf::Dictionary::from_iter(vec![
            ("Type", Name("XObject".into())),
            ("Subtype", Name("Image".into())),
            ("Width", Integer(image.width as i64)),
            ("Height", Integer(image.height as i64)),
            ("ColorSpace", Name(image.color_space.into())),
            (
                "BitsPerComponent",
                Integer(image.bits_per_component as i64),
            ),
        ]);
        if let Some(filter) = image.filter {
            image_dictionary.set("Filter", Name(filter.into()));
        }
        if let Some(soft_mask_id) = soft_mask_id {
            image_dictionary.set("SMask", Reference(soft_mask_id));
        }

        // Data which is already encoded must not be compressed a second time
        let image_stream = lopdf::Stream::new(image_dictionary, image.data.clone())
            .with_compression(image.filter.is_none());
        let image_id = self.inner_document.add_object(image_stream);

        let reference = XObjectReference::new(self.images.len());
        self.images.push(image_id);
        reference
    }

    /// Paints a filled shape with the given color onto a layer.
    pub fn fill_shape_in_layer(
        &mut self,
        page_index: usize,
        layer_index: usize,
        color: UnitRgb,
        shape: &Shape,
    ) -> Result<(), ContextError> {
        let mut operations = vec![
            Operation::new("q", vec![]),
            Operation::new("rg", color.iter().map(|c| Object::Real(*c)).collect()),
        ];
        match shape {
            Shape::Rectangle(rect) => {
                operations.push(Operation::new("re", rect_operands(rect)));
            }
            Shape::Ellipse {
                center,
                radius_x,
                radius_y,
            } => {
                operations.extend(ellipse_operations(*center, *radius_x, *radius_y));
            }
            Shape::Path(segments) => {
                operations.extend(path_operations(segments));
            }
        }
        operations.push(Operation::new("f", vec![]));
        operations.push(Operation::new("Q", vec![]));

        self.add_operations_to_layer_in_page(layer_index, page_index, operations)
    }

    /// Writes a line of text with the given standard font, size and color, with its baseline
    /// starting at the caret position (in points).
    ///
    /// # Arguments
    ///
    /// * `page_index` - The index of the page to write the text to (should be previously obtained).
    /// * `layer_index` - The index of the layer to write the text to (should be previously obtained).
    /// * `color` - The RGB color employed for filling of the text.
    /// * `text` - The text to be written at the given layer in the given page.
    /// * `font` - The standard face, registered on the fly if needed.
    /// * `font_size` - The size of the font.
    /// * `caret_position` - The position in points where the baseline of the text begins.
    #[allow(clippy::too_many_arguments)]
    pub fn write_text_to_layer_in_page(
        &mut self,
        page_index: usize,
        layer_index: usize,
        color: UnitRgb,
        text: &str,
        font: StandardFont,
        font_size: f32,
        caret_position: [f32; 2],
    ) -> Result<(), ContextError> {
        let font_name = self.use_font(font);
        let [x, y] = caret_position;

        self.add_operations_to_layer_in_page(
            layer_index,
            page_index,
            vec![
                Operation::new("BT", vec![]),
                Operation::new(
                    "Tf",
                    vec![Object::Name(font_name.into_bytes()), font_size.into()],
                ),
                Operation::new("Td", vec![x.into(), y.into()]),
                Operation::new("rg", color.iter().map(|c| Object::Real(*c)).collect()),
                Operation::new(
                    "Tj",
                    vec![Object::String(
                        encode_win_ansi(text),
                        StringFormat::Hexadecimal,
                    )],
                ),
                Operation::new("ET", vec![]),
            ],
        )
    }

    /// Draws an image previously added with `add_image`, scaled to the placement rectangle and
    /// optionally clipped to another rectangle (both in points).
    pub fn draw_image_to_layer_in_page(
        &mut self,
        page_index: usize,
        layer_index: usize,
        image: &XObjectReference,
        placement: PdfRect,
        clip: Option<PdfRect>,
    ) -> Result<(), ContextError> {
        let image_id = image
            .name()
            .trim_start_matches('X')
            .parse::<usize>()
            .ok()
            .and_then(|index| self.images.get(index).copied())
            .ok_or(ContextError::with_kind(
                ErrorKind::Pdf,
                format!("Failed to find the image {:?} in the document", image.name()),
            ))?;
        self.get_mut_page(page_index)?
            .resources
            .xobjects
            .0
            .insert(image.name().to_string(), image_id);

        let mut operations = vec![Operation::new("q", vec![])];
        if let Some(clip) = clip {
            operations.push(Operation::new("re", rect_operands(&clip)));
            operations.push(Operation::new("W", vec![]));
            operations.push(Operation::new("n", vec![]));
        }
        operations.push(Operation::new(
            "cm",
            vec![
                placement.width.into(),
                0.0f32.into(),
                0.0f32.into(),
                placement.height.into(),
                placement.x.into(),
                placement.y.into(),
            ],
        ));
        operations.push(Operation::new(
            "Do",
            vec![Object::Name(image.name().as_bytes().to_vec())],
        ));
        operations.push(Operation::new("Q", vec![]));

        self.add_operations_to_layer_in_page(layer_index, page_index, operations)
    }

    /// Write the operations so far specified to the PDF file and finalize it.
    ///
    /// One mandatory argument needed by the PDF specification is the instance ID, which together with
    /// the document identifier forms the `ID` entry of the trailer.
    pub fn write_all(&mut self, instance_id: String) -> Result<(), ContextError> {
        use lopdf::Object::*;
        use lopdf::StringFormat::*;

        let timestamp = to_pdf_timestamp_format(&self.creation_date);
        let document_info = lopdf::Dictionary::from_iter(vec![
            ("Trapped", Name("False".into())),
            ("CreationDate", String(timestamp.clone().into_bytes(), Literal)),
            ("ModDate", String(timestamp.into_bytes(), Literal)),
            ("Title", to_pdf_text_string(&self.title)),
            (
                "Producer",
                String(
                    format!("bookpress {}", env!("CARGO_PKG_VERSION")).into_bytes(),
                    Literal,
                ),
            ),
            (
                "Identifier",
                String(self.identifier.clone().into_bytes(), Literal),
            ),
        ]);
        let document_info_id = self.inner_document.add_object(Dictionary(document_info));

        // Construct the catalog, required by the PDF specification
        let pages_id = self.inner_document.new_object_id();
        let mut catalog = lopdf::Dictionary::from_iter(vec![
            ("Type", Name("Catalog".into())),
            ("PageLayout", Name("OneColumn".into())),
            ("PageMode", Name("UseNone".into())),
            ("Pages", Reference(pages_id)),
        ]);

        let mut pages = lopdf::Dictionary::from_iter(vec![
            ("Type", Name("Pages".into())),
            ("Count", Integer(self.pages.len() as i64)),
        ]);

        // Construct the array which explains the intents of the optional content groups
        let intent_array = Array(vec![Name("View".into()), Name("Design".into())]);
        let intent_array_id = self.inner_document.add_object(intent_array);

        let page_layer_numbers_and_names: Vec<(usize, Vec<::std::string::String>)> = self
            .pages
            .iter()
            .map(|page| {
                (
                    page.number,
                    page.layers.iter().map(|layer| layer.name.clone()).collect(),
                )
            })
            .collect();

        // Insert one optional content group per layer of every page
        let ocg_association: Vec<(usize, Vec<(usize, lopdf::Object)>)> =
            page_layer_numbers_and_names
                .into_iter()
                .map(|(page_number, layer_names)| {
                    let layer_indices_and_dictionary_references = layer_names
                        .into_iter()
                        .enumerate()
                        .map(|(layer_index, layer_name)| {
                            let ocg_dictionary = lopdf::Dictionary::from_iter(vec![
                                ("Type", Name("OCG".into())),
                                ("Name", String(layer_name.into(), Literal)),
                                ("Intent", Reference(intent_array_id)),
                            ]);
                            let ocg_dictionary_id =
                                self.inner_document.add_object(Dictionary(ocg_dictionary));

                            (layer_index, Reference(ocg_dictionary_id))
                        })
                        .collect();

                    (page_number, layer_indices_and_dictionary_references)
                })
                .collect();

        let ocg_dictionary_references: Vec<lopdf::Object> = ocg_association
            .iter()
            .flat_map(|(_, layers)| {
                layers
                    .iter()
                    .map(|(_, dictionary_reference)| dictionary_reference.clone())
            })
            .collect();

        catalog.set(
            "OCProperties",
            Dictionary(lopdf::Dictionary::from_iter(vec![
                ("OCGs", Array(ocg_dictionary_references.clone())),
                (
                    "D",
                    Dictionary(lopdf::Dictionary::from_iter(vec![
                        ("Order", Array(ocg_dictionary_references.clone())),
                        ("RBGroups", Array(vec![])),
                        ("ON", Array(ocg_dictionary_references)),
                    ])),
                ),
            ])),
        );

        let catalog_id = self.inner_document.add_object(catalog);
        self.inner_document
            .trailer
            .set("Root", Reference(catalog_id));
        self.inner_document
            .trailer
            .set("Info", Reference(document_info_id));
        self.inner_document.trailer.set(
            "ID",
            Array(vec![
                String(self.identifier.clone().into_bytes(), Literal),
                String(instance_id.into_bytes(), Literal),
            ]),
        );

        let fonts_dictionary = self.insert_fonts_into_document();
        let fonts_dictionary_id = self.inner_document.add_object(fonts_dictionary);

        let mut page_ids = Vec::<lopdf::Object>::new();
        for (index, page) in self.pages.iter_mut().enumerate() {
            let page_box = || {
                Array(vec![
                    Integer(0),
                    Integer(0),
                    Real(page.width),
                    Real(page.height),
                ])
            };
            let mut page_dictionary = lopdf::Dictionary::from_iter(vec![
                ("Type", Name("Page".into())),
                ("Rotate", Integer(0)),
                ("MediaBox", page_box()),
                ("TrimBox", page_box()),
                ("BleedBox", page_box()),
                ("CropBox", page_box()),
                ("Parent", Reference(pages_id)),
            ]);

            let unmerged_layer = ocg_association
                .iter()
                .find(|ocg| ocg.0 - 1 == index)
                .ok_or(ContextError::with_kind(
                    ErrorKind::Pdf,
                    format!(
                        "Unable to collect the resources needed for rendering the page {}",
                        index
                    ),
                ))?;

            let (mut resource_dictionary, layer_streams) =
                page.collect_resources_and_streams(&unmerged_layer.1)?;

            resource_dictionary.set("Font", Reference(fonts_dictionary_id));
            let resources_page_id = self
                .inner_document
                .add_object(Dictionary(resource_dictionary));
            page_dictionary.set("Resources", Reference(resources_page_id));

            // Merge all streams of the individual layers into one unified stream, in painting order
            let mut merged_layer_streams = Vec::<u8>::new();
            for mut stream in layer_streams {
                merged_layer_streams.append(&mut stream.content);
            }
            let merged_layer_stream =
                lopdf::Stream::new(lopdf::Dictionary::new(), merged_layer_streams);
            let page_content_id = self.inner_document.add_object(merged_layer_stream);
            page_dictionary.set("Contents", Reference(page_content_id));

            let page_id = self.inner_document.add_object(page_dictionary);
            page_ids.push(Reference(page_id))
        }

        pages.set("Kids", Array(page_ids));
        self.inner_document
            .objects
            .insert(pages_id, Dictionary(pages));

        Ok(())
    }

    /// Optimize the PDF document (only superficially).
    pub fn optimize(&mut self) {
        self.inner_document.prune_objects();
        self.inner_document.delete_zero_length_streams();
        self.inner_document.renumber_objects();
        self.inner_document.compress();
    }

    /// Save the `PdfDocument` to bytes in order for it to be written to a file or further processed.
    pub fn save_to_bytes(&mut self) -> Result<Vec<u8>, ContextError> {
        let mut pdf_document_bytes = Vec::new();
        let mut writer = BufWriter::new(&mut pdf_document_bytes);
        self.inner_document.save_to(&mut writer).map_err(|error| {
            ContextError::with_error("Error while saving the PDF document to bytes", &error)
                .kind(ErrorKind::Pdf)
        })?;
        mem::drop(writer);

        Ok(pdf_document_bytes)
    }

    /// Converts the standard fonts into a dictionary and inserts them into the document.
    fn insert_fonts_into_document(&mut self) -> lopdf::Dictionary {
        use lopdf::Object::*;
        let mut font_dictionary = lopdf::Dictionary::new();

        for (font_name, (font_object_id, font)) in self.fonts.iter() {
            let standard_font = lopdf::Dictionary::from_iter(vec![
                ("Type", Name("Font".into())),
                ("Subtype", Name("Type1".into())),
                ("BaseFont", Name(font.base_font_name().into())),
                ("Encoding", Name("WinAnsiEncoding".into())),
            ]);
            self.inner_document
                .objects
                .insert(*font_object_id, Dictionary(standard_font));
            font_dictionary.set(font_name.clone(), Reference(*font_object_id));
        }

        font_dictionary
    }

    /// This function is responsible for adding the given operations to the specified layer and page.
    fn add_operations_to_layer_in_page(
        &mut self,
        layer_index: usize,
        page_index: usize,
        operations: Vec<Operation>,
    ) -> Result<(), ContextError> {
        let pdf_layer_reference = self.get_mut_layer_in_page(layer_index, page_index)?;
        pdf_layer_reference.operations.extend(operations);

        Ok(())
    }

    fn get_mut_page(&mut self, page_index: usize) -> Result<&mut PdfPage, ContextError> {
        self.pages
            .get_mut(page_index)
            .ok_or(ContextError::with_kind(
                ErrorKind::Pdf,
                format!("Failed to find the page with index {}", page_index),
            ))
    }

    // Retrieve the specified layer in the given page via the respective indices.
    fn get_mut_layer_in_page(
        &mut self,
        layer_index: usize,
        page_index: usize,
    ) -> Result<&mut PdfLayer, ContextError> {
        self.get_mut_page(page_index)?
            .layers
            .get_mut(layer_index)
            .ok_or(ContextError::with_kind(
                ErrorKind::Pdf,
                format!("Failed to find the layer with index {}", layer_index),
            ))
    }
}

fn rect_operands(rect: &PdfRect) -> Vec<Object> {
    vec![
        rect.x.into(),
        rect.y.into(),
        rect.width.into(),
        rect.height.into(),
    ]
}

/// The path of an ellipse as four cubic bezier arcs, starting from its rightmost point and going
/// counterclockwise.
fn ellipse_operations(center: [f32; 2], radius_x: f32, radius_y: f32) -> Vec<Operation> {
    let [cx, cy] = center;
    let kx = radius_x * BEZIER_CIRCLE_FACTOR;
    let ky = radius_y * BEZIER_CIRCLE_FACTOR;
    let curve = |points: [f32; 6]| Operation::new("c", points.iter().map(|p| (*p).into()).collect());

    vec![
        Operation::new("m", vec![(cx + radius_x).into(), cy.into()]),
        curve([cx + radius_x, cy + ky, cx + kx, cy + radius_y, cx, cy + radius_y]),
        curve([cx - kx, cy + radius_y, cx - radius_x, cy + ky, cx - radius_x, cy]),
        curve([cx - radius_x, cy - ky, cx - kx, cy - radius_y, cx, cy - radius_y]),
        curve([cx + kx, cy - radius_y, cx + radius_x, cy - ky, cx + radius_x, cy]),
        Operation::new("h", vec![]),
    ]
}

fn path_operations(segments: &[PathSegment]) -> Vec<Operation> {
    let mut operations: Vec<Operation> = segments
        .iter()
        .map(|segment| match segment {
            PathSegment::MoveTo([x, y]) => Operation::new("m", vec![(*x).into(), (*y).into()]),
            PathSegment::LineTo([x, y]) => Operation::new("l", vec![(*x).into(), (*y).into()]),
            PathSegment::CurveTo(points) => {
                Operation::new("c", points.iter().map(|p| (*p).into()).collect())
            }
        })
        .collect();
    operations.push(Operation::new("h", vec![]));
    operations
}

/// Encodes text meant for a viewer, such as the document title. ASCII text is written as it is,
/// anything else as UTF-16BE preceded by its byte order mark.
fn to_pdf_text_string(text: &str) -> Object {
    if text.is_ascii() {
        return Object::String(text.as_bytes().to_vec(), StringFormat::Literal);
    }

    let mut bytes = vec![0xFE, 0xFF];
    bytes.extend(text.encode_utf16().flat_map(u16::to_be_bytes));
    Object::String(bytes, StringFormat::Hexadecimal)
}

/// Formats the given time so that it matches what the PDF specification expects.
/// An example of it is the following: D:20170505150224+02'00'.
fn to_pdf_timestamp_format(date: &OffsetDateTime) -> String {
    let offset = date.offset();
    let offset_sign = if offset.is_negative() { '-' } else { '+' };
    format!(
        "D:{:04}{:02}{:02}{:02}{:02}{:02}{offset_sign}{:02}'{:02}'",
        date.year(),
        u8::from(date.month()),
        date.day(),
        date.hour(),
        date.minute(),
        date.second(),
        offset.whole_hours().abs(),
        offset.minutes_past_hour().abs(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page_content(document: &lopdf::Document, page_number: u32) -> String {
        let page_id = document.get_pages()[&page_number];
        String::from_utf8_lossy(&document.get_page_content(page_id).unwrap()).to_string()
    }

    #[test]
    fn writes_pages_of_the_requested_size() {
        let mut pdf_document = PdfDocument::new("test".into());
        let (page_index, layer_index) = pdf_document.add_page_with_layer(612.0, 792.0, "Text");
        pdf_document
            .write_text_to_layer_in_page(
                page_index,
                layer_index,
                [0.0, 0.0, 0.0],
                "Hello, owl!",
                StandardFont::Helvetica,
                18.0,
                [72.0, 700.0],
            )
            .unwrap();
        pdf_document.add_page_with_layer(612.0, 792.0, "Empty");
        pdf_document.write_all("instance".into()).unwrap();
        let bytes = pdf_document.save_to_bytes().unwrap();

        let document = lopdf::Document::load_mem(&bytes).unwrap();
        assert_eq!(document.get_pages().len(), 2);
        let content = page_content(&document, 1);
        assert!(content.contains("BT"), "{content}");
        assert!(content.contains("/F0 "), "{content}");
        assert!(content.contains("Tf"), "{content}");
    }

    #[test]
    fn fonts_are_registered_once() {
        let mut pdf_document = PdfDocument::new("test".into());
        assert_eq!(pdf_document.use_font(StandardFont::TimesRoman), "F0");
        assert_eq!(pdf_document.use_font(StandardFont::Courier), "F1");
        assert_eq!(pdf_document.use_font(StandardFont::TimesRoman), "F0");
    }

    #[test]
    fn images_are_referenced_from_the_page_resources() {
        let mut pdf_document = PdfDocument::new("test".into());
        let (page_index, layer_index) = pdf_document.add_page_with_layer(100.0, 100.0, "Image");
        let image = pdf_document.add_image(&PdfImage {
            width: 1,
            height: 1,
            color_space: "DeviceRGB",
            bits_per_component: 8,
            filter: None,
            data: vec![255, 0, 0],
            alpha: Some(vec![128]),
        });
        pdf_document
            .draw_image_to_layer_in_page(
                page_index,
                layer_index,
                &image,
                PdfRect {
                    x: -10.0,
                    y: 0.0,
                    width: 120.0,
                    height: 100.0,
                },
                Some(PdfRect {
                    x: 0.0,
                    y: 0.0,
                    width: 100.0,
                    height: 100.0,
                }),
            )
            .unwrap();
        assert!(pdf_document
            .draw_image_to_layer_in_page(
                page_index,
                layer_index,
                &XObjectReference::new(7),
                PdfRect::default(),
                None
            )
            .is_err());

        pdf_document.write_all("instance".into()).unwrap();
        pdf_document.optimize();
        let bytes = pdf_document.save_to_bytes().unwrap();
        let document = lopdf::Document::load_mem(&bytes).unwrap();
        let content = page_content(&document, 1);
        assert!(content.contains("/X0 Do"), "{content}");
        assert!(content.contains("W"), "{content}");
    }

    #[test]
    fn titles_outside_ascii_are_written_as_utf16() {
        assert!(matches!(
            to_pdf_text_string("Owl"),
            Object::String(bytes, StringFormat::Literal) if bytes == b"Owl"
        ));

        let mut pdf_document = PdfDocument::new("test".into());
        pdf_document.title = "Chouette à lunettes".into();
        pdf_document.add_page_with_layer(100.0, 100.0, "Empty");
        pdf_document.write_all("instance".into()).unwrap();
        let bytes = pdf_document.save_to_bytes().unwrap();

        let document = lopdf::Document::load_mem(&bytes).unwrap();
        let info_id = document
            .trailer
            .get(b"Info")
            .unwrap()
            .as_reference()
            .unwrap();
        let title = document
            .get_dictionary(info_id)
            .unwrap()
            .get(b"Title")
            .unwrap()
            .as_str()
            .unwrap();
        assert_eq!(&title[..2], &[0xFE, 0xFF]);
        let units: Vec<u16> = title[2..]
            .chunks(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        assert_eq!(String::from_utf16(&units).unwrap(), "Chouette à lunettes");
    }

    #[test]
    fn formats_timestamps() {
        assert_eq!(
            to_pdf_timestamp_format(&OffsetDateTime::UNIX_EPOCH),
            "D:19700101000000+00'00'"
        );
    }
}
