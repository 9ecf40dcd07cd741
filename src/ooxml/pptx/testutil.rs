//! In-memory fixture decks for tests.
use crate::ooxml::opc::constants::{content_type as ct, ext_uri, namespace as ns, relationship_type as rt};
use crate::ooxml::opc::{OpcPackage, PackURI, Relationships};
use crate::ooxml::pptx::Package;

pub(crate) const NS_DECL: &str = r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#;

#[derive(Default)]
struct SlideSpec {
    title: String,
    content: String,
    images: Vec<String>,
    charts: Vec<String>,
    comments: Vec<(String, String)>,
    link_to: Option<usize>,
    notes: bool,
}

/// Builds a minimal but complete presentation: one master, one layout,
/// one theme, and whatever slides, media, charts, comments and sections
/// are requested.
#[derive(Default)]
pub(crate) struct DeckBuilder {
    slides: Vec<SlideSpec>,
    sections: Vec<(String, Vec<usize>)>,
    defaults: Vec<(String, String)>,
    authors: Vec<String>,
}

impl DeckBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Slide with a single title shape.
    pub fn slide(mut self, title: &str) -> Self {
        self.slides.push(SlideSpec {
            title: title.to_string(),
            ..Default::default()
        });
        self
    }

    /// Slide with a title plus raw markup appended to its shape tree.
    pub fn slide_with(mut self, title: &str, content: &str) -> Self {
        self.slides.push(SlideSpec {
            title: title.to_string(),
            content: content.to_string(),
            ..Default::default()
        });
        self
    }

    /// Picture on slide `idx` backed by `/ppt/media/{name}`; reusing a name shares the part.
    pub fn image(mut self, idx: usize, name: &str) -> Self {
        self.slides[idx].images.push(name.to_string());
        self
    }

    /// Chart on slide `idx` whose plot area holds `c:{tag}`.
    pub fn chart(mut self, idx: usize, tag: &str) -> Self {
        self.slides[idx].charts.push(tag.to_string());
        self
    }

    pub fn comment(mut self, idx: usize, author: &str, text: &str) -> Self {
        self.slides[idx]
            .comments
            .push((author.to_string(), text.to_string()));
        self
    }

    /// Registered comment author without comments of their own.
    pub fn author(mut self, name: &str) -> Self {
        self.authors.push(name.to_string());
        self
    }

    pub fn notes(mut self, idx: usize) -> Self {
        self.slides[idx].notes = true;
        self
    }

    /// Slide-to-slide hyperlink relationship from `from` to `to`.
    pub fn link(mut self, from: usize, to: usize) -> Self {
        self.slides[from].link_to = Some(to);
        self
    }

    /// Section over 0-based slide positions.
    pub fn section(mut self, name: &str, slides: &[usize]) -> Self {
        self.sections.push((name.to_string(), slides.to_vec()));
        self
    }

    pub fn default_type(mut self, ext: &str, content_type: &str) -> Self {
        self.defaults.push((ext.to_string(), content_type.to_string()));
        self
    }

    pub fn build(self) -> Package {
        let mut opc = OpcPackage::new();
        let pres_uri = uri("/ppt/presentation.xml");

        let mut pkg_rels = Relationships::new("/");
        pkg_rels.add(rt::OFFICE_DOCUMENT, "ppt/presentation.xml", false);
        opc.set_relationships(&PackURI::package(), &pkg_rels);
        for (ext, content_type) in &self.defaults {
            opc.content_types_mut().add_default(ext, content_type);
        }

        // Master, layout, theme
        let master = uri("/ppt/slideMasters/slideMaster1.xml");
        let layout = uri("/ppt/slideLayouts/slideLayout1.xml");
        let theme = uri("/ppt/theme/theme1.xml");
        put(
            &mut opc,
            &master,
            ct::PML_SLIDE_MASTER,
            format!(
                r#"<p:sldMaster {NS_DECL}><p:cSld><p:spTree>{}</p:spTree></p:cSld><p:sldLayoutIdLst><p:sldLayoutId id="2147483649" r:id="rId1"/></p:sldLayoutIdLst></p:sldMaster>"#,
                group_props()
            ),
        );
        rels(&mut opc, &master, &[(rt::SLIDE_LAYOUT, "../slideLayouts/slideLayout1.xml"), (rt::THEME, "../theme/theme1.xml")]);
        put(
            &mut opc,
            &layout,
            ct::PML_SLIDE_LAYOUT,
            format!(
                r#"<p:sldLayout {NS_DECL} type="title"><p:cSld name="Title Slide"><p:spTree>{}</p:spTree></p:cSld></p:sldLayout>"#,
                group_props()
            ),
        );
        rels(&mut opc, &layout, &[(rt::SLIDE_MASTER, "../slideMasters/slideMaster1.xml")]);
        put(
            &mut opc,
            &theme,
            ct::OFC_THEME,
            format!(r#"<a:theme xmlns:a="{}" name="Office"/>"#, ns::DML_MAIN),
        );

        let mut pres_rels = Relationships::new("/ppt");
        let master_rid = pres_rels.add(rt::SLIDE_MASTER, "slideMasters/slideMaster1.xml", false);
        pres_rels.add(rt::THEME, "theme/theme1.xml", false);

        let wants_notes = self.slides.iter().any(|s| s.notes);
        let mut notes_lst = String::new();
        if wants_notes {
            let notes_master = uri("/ppt/notesMasters/notesMaster1.xml");
            put(
                &mut opc,
                &notes_master,
                ct::PML_NOTES_MASTER,
                format!(r#"<p:notesMaster {NS_DECL}><p:cSld><p:spTree>{}</p:spTree></p:cSld></p:notesMaster>"#, group_props()),
            );
            rels(&mut opc, &notes_master, &[(rt::THEME, "../theme/theme1.xml")]);
            let r_id = pres_rels.add(rt::NOTES_MASTER, "notesMasters/notesMaster1.xml", false);
            notes_lst = format!(r#"<p:notesMasterIdLst><p:notesMasterId r:id="{r_id}"/></p:notesMasterIdLst>"#);
        }

        // Comment authors in first-seen order
        let mut authors: Vec<(String, u32)> = Vec::new();
        for spec in &self.slides {
            for (author, _) in &spec.comments {
                match authors.iter_mut().find(|(name, _)| name == author) {
                    Some((_, count)) => *count += 1,
                    None => authors.push((author.clone(), 1)),
                }
            }
        }
        for name in &self.authors {
            if !authors.iter().any(|(known, _)| known == name) {
                authors.push((name.clone(), 0));
            }
        }
        let mut author_next_idx: Vec<u32> = vec![1; authors.len()];

        let mut sld_ids = String::new();
        let mut chart_no = 0;
        let mut comment_no = 0;
        let has_images = self.slides.iter().any(|s| !s.images.is_empty());
        let has_charts = self.slides.iter().any(|s| !s.charts.is_empty());
        if has_images {
            opc.content_types_mut().add_default("png", "image/png");
        }
        if has_charts {
            opc.content_types_mut().add_default("xlsx", ct::OFC_SPREADSHEET);
        }

        for (i, spec) in self.slides.iter().enumerate() {
            let n = i + 1;
            let slide = uri(&format!("/ppt/slides/slide{n}.xml"));
            let mut slide_rels = Relationships::new("/ppt/slides");
            slide_rels.add(rt::SLIDE_LAYOUT, "../slideLayouts/slideLayout1.xml", false);

            let mut shape_id = 2;
            let mut body = title_shape(shape_id, &spec.title);
            for image in &spec.images {
                let media = uri(&format!("/ppt/media/{image}"));
                if !opc.contains(&media) {
                    opc.add(&media, format!("PNG:{image}").into_bytes());
                }
                let r_id = slide_rels.add(rt::IMAGE, &format!("../media/{image}"), false);
                shape_id += 1;
                body.push_str(&picture(shape_id, &r_id));
            }
            for tag in &spec.charts {
                chart_no += 1;
                let chart = uri(&format!("/ppt/charts/chart{chart_no}.xml"));
                put(&mut opc, &chart, ct::DML_CHART, chart_space(tag));
                let colors = uri(&format!("/ppt/charts/colors{chart_no}.xml"));
                let style = uri(&format!("/ppt/charts/style{chart_no}.xml"));
                put(&mut opc, &colors, ct::DML_CHART_COLOR_STYLE, r#"<cs:colorStyle xmlns:cs="http://schemas.microsoft.com/office/drawing/2012/chartStyle" meth="cycle"/>"#.to_string());
                put(&mut opc, &style, ct::DML_CHART_STYLE, r#"<cs:chartStyle xmlns:cs="http://schemas.microsoft.com/office/drawing/2012/chartStyle" id="201"/>"#.to_string());
                opc.add(
                    &format!("/ppt/embeddings/Microsoft_Excel_Worksheet{chart_no}.xlsx"),
                    b"PK-xlsx".to_vec(),
                );
                let workbook = format!("../embeddings/Microsoft_Excel_Worksheet{chart_no}.xlsx");
                let colors_ref = format!("colors{chart_no}.xml");
                let style_ref = format!("style{chart_no}.xml");
                rels(
                    &mut opc,
                    &chart,
                    &[
                        (rt::PACKAGE, workbook.as_str()),
                        (rt::CHART_COLOR_STYLE, colors_ref.as_str()),
                        (rt::CHART_STYLE, style_ref.as_str()),
                    ],
                );
                let r_id = slide_rels.add(rt::CHART, &format!("../charts/chart{chart_no}.xml"), false);
                shape_id += 1;
                body.push_str(&chart_frame(shape_id, &r_id));
            }
            body.push_str(&spec.content);

            if !spec.comments.is_empty() {
                comment_no += 1;
                let comments = uri(&format!("/ppt/comments/comment{comment_no}.xml"));
                let mut xml = format!(r#"<p:cmLst xmlns:p="{}">"#, ns::PML_MAIN);
                for (author, text) in &spec.comments {
                    let Some(author_id) = authors.iter().position(|(name, _)| name == author) else {
                        continue;
                    };
                    let idx = author_next_idx[author_id];
                    author_next_idx[author_id] += 1;
                    xml.push_str(&format!(
                        r#"<p:cm authorId="{author_id}" dt="2024-01-01T10:00:00.000" idx="{idx}"><p:pos x="10" y="10"/><p:text>{text}</p:text></p:cm>"#
                    ));
                }
                xml.push_str("</p:cmLst>");
                put(&mut opc, &comments, ct::PML_COMMENTS, xml);
                slide_rels.add(rt::COMMENTS, &format!("../comments/comment{comment_no}.xml"), false);
            }

            if spec.notes {
                let notes = uri(&format!("/ppt/notesSlides/notesSlide{n}.xml"));
                put(
                    &mut opc,
                    &notes,
                    ct::PML_NOTES_SLIDE,
                    format!(
                        r#"<p:notes {NS_DECL}><p:cSld><p:spTree>{}{}</p:spTree></p:cSld></p:notes>"#,
                        group_props(),
                        title_shape(2, &format!("Notes {n}"))
                    ),
                );
                let back_ref = format!("../slides/slide{n}.xml");
                rels(
                    &mut opc,
                    &notes,
                    &[
                        (rt::NOTES_MASTER, "../notesMasters/notesMaster1.xml"),
                        (rt::SLIDE, back_ref.as_str()),
                    ],
                );
                slide_rels.add(rt::NOTES_SLIDE, &format!("../notesSlides/notesSlide{n}.xml"), false);
            }

            if let Some(to) = spec.link_to {
                slide_rels.add(rt::SLIDE, &format!("slide{}.xml", to + 1), false);
            }

            put(
                &mut opc,
                &slide,
                ct::PML_SLIDE,
                format!(
                    r#"<p:sld {NS_DECL}><p:cSld><p:spTree>{}{body}</p:spTree></p:cSld></p:sld>"#,
                    group_props()
                ),
            );
            opc.set_relationships(&slide, &slide_rels);

            let r_id = pres_rels.add(rt::SLIDE, &format!("slides/slide{n}.xml"), false);
            sld_ids.push_str(&format!(r#"<p:sldId id="{}" r:id="{r_id}"/>"#, 256 + i));
        }

        if !authors.is_empty() {
            let registry = uri("/ppt/commentAuthors.xml");
            let mut xml = format!(r#"<p:cmAuthorLst xmlns:p="{}">"#, ns::PML_MAIN);
            for (id, (name, count)) in authors.iter().enumerate() {
                let initials: String = name.chars().take(1).collect();
                xml.push_str(&format!(
                    r#"<p:cmAuthor id="{id}" name="{name}" initials="{initials}" lastIdx="{count}" clrIdx="{id}"/>"#
                ));
            }
            xml.push_str("</p:cmAuthorLst>");
            put(&mut opc, &registry, ct::PML_COMMENT_AUTHORS, xml);
            pres_rels.add(rt::COMMENT_AUTHORS, "commentAuthors.xml", false);
        }

        let mut ext_lst = String::new();
        if !self.sections.is_empty() {
            ext_lst.push_str(&format!(
                r#"<p:extLst><p:ext uri="{}"><p14:sectionLst xmlns:p14="{}">"#,
                ext_uri::SECTION_LIST,
                ns::PML_2010
            ));
            for (k, (name, slides)) in self.sections.iter().enumerate() {
                ext_lst.push_str(&format!(
                    r#"<p14:section name="{name}" id="{{00000000-0000-0000-0000-{:012}}}"><p14:sldIdLst>"#,
                    k + 1
                ));
                for pos in slides {
                    ext_lst.push_str(&format!(r#"<p14:sldId id="{}"/>"#, 256 + pos));
                }
                ext_lst.push_str("</p14:sldIdLst></p14:section>");
            }
            ext_lst.push_str("</p14:sectionLst></p:ext></p:extLst>");
        }

        put(
            &mut opc,
            &pres_uri,
            ct::PML_PRESENTATION_MAIN,
            format!(
                r#"<p:presentation {NS_DECL}><p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="{master_rid}"/></p:sldMasterIdLst>{notes_lst}<p:sldIdLst>{sld_ids}</p:sldIdLst><p:sldSz cx="9144000" cy="6858000"/><p:notesSz cx="6858000" cy="9144000"/>{ext_lst}</p:presentation>"#
            ),
        );
        opc.set_relationships(&pres_uri, &pres_rels);

        Package::from_opc(opc).expect("fixture deck is a presentation")
    }
}

fn uri(s: &str) -> PackURI {
    PackURI::new(s).expect("absolute fixture path")
}

fn put(opc: &mut OpcPackage, partname: &PackURI, content_type: &str, xml: String) {
    opc.content_types_mut().set_override(partname, content_type);
    opc.add(partname, xml.into_bytes());
}

fn rels(opc: &mut OpcPackage, source: &PackURI, targets: &[(&str, &str)]) {
    let mut set = Relationships::new(source.base_uri());
    for (reltype, target) in targets {
        set.add(reltype, target, false);
    }
    opc.set_relationships(source, &set);
}

fn group_props() -> &'static str {
    r#"<p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>"#
}

pub(crate) fn title_shape(id: u32, text: &str) -> String {
    format!(
        r#"<p:sp><p:nvSpPr><p:cNvPr id="{id}" name="Title {id}"/><p:cNvSpPr/><p:nvPr/></p:nvSpPr><p:spPr/><p:txBody><a:bodyPr/><a:p><a:r><a:t>{text}</a:t></a:r></a:p></p:txBody></p:sp>"#
    )
}

fn picture(id: u32, r_id: &str) -> String {
    format!(
        r#"<p:pic><p:nvPicPr><p:cNvPr id="{id}" name="Picture {id}" descr="image"/><p:cNvPicPr/><p:nvPr/></p:nvPicPr><p:blipFill><a:blip r:embed="{r_id}"/></p:blipFill><p:spPr/></p:pic>"#
    )
}

fn chart_frame(id: u32, r_id: &str) -> String {
    format!(
        r#"<p:graphicFrame><p:nvGraphicFramePr><p:cNvPr id="{id}" name="Chart {id}"/><p:cNvGraphicFramePr/><p:nvPr/></p:nvGraphicFramePr><p:xfrm/><a:graphic><a:graphicData uri="{}"><c:chart xmlns:c="{}" r:id="{r_id}"/></a:graphicData></a:graphic></p:graphicFrame>"#,
        ns::DML_CHART,
        ns::DML_CHART
    )
}

fn chart_space(tag: &str) -> String {
    format!(
        r#"<c:chartSpace xmlns:c="{}" xmlns:a="{}" xmlns:r="{}"><c:chart><c:plotArea><c:layout/><c:{tag}><c:varyColors val="0"/></c:{tag}><c:catAx/></c:plotArea></c:chart><c:externalData r:id="rId1"/></c:chartSpace>"#,
        ns::DML_CHART,
        ns::DML_MAIN,
        ns::OFC_RELATIONSHIPS
    )
}
