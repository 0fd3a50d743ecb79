//! Built-in bank definitions

use crate::config::{ResultLimit, SourceSpec};
use crate::fetch::Pages;
use crate::locator::{default_max_depth, default_min_cells, default_threshold, CarryOverPolicy, LocatorSpec};
use crate::schema::{FieldSpec, LocateSpec};

const BPI_BASE: &str = "https://www.buenamano.ph/";
const BDO_URL: &str = "https://www.bdo.com.ph/personal/assets-for-sale/real-estate/results-page";
const EASTWEST_URL: &str = "https://pre-owned-properties.eastwestbanker.com/";

/// Every bank known out of the box, in listing order.
pub fn builtin() -> Vec<SourceSpec> {
    vec![bpi(), bpi_detail(), bdo(), eastwest_bank(), pnb(), metrobank()]
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

fn boundary(container: Option<&str>, title: &str, actions: Option<&str>) -> LocatorSpec {
    LocatorSpec::Boundary {
        container: container.map(String::from),
        title: title.to_string(),
        actions: actions.map(String::from),
        max_depth: default_max_depth(),
    }
}

/// Buena Mano search results.
fn bpi() -> SourceSpec {
    let absolute = format!("absolute_url:{BPI_BASE}");
    SourceSpec {
        id: "bpi".to_string(),
        name: "BPI".to_string(),
        pages: Some(Pages::single("https://www.buenamano.ph/search/result")),
        locator: boundary(Some("div.result-each"), "h4", None),
        fields: vec![
            FieldSpec::new("title", LocateSpec::css("h4")),
            FieldSpec::new("type", LocateSpec::before("title", "(")),
            FieldSpec::new("id", LocateSpec::enclosed("title")),
            FieldSpec::new("detail_url", LocateSpec::css_with("h4 a", "attr:href"))
                .transform(&absolute),
            FieldSpec::new(
                "property_id",
                LocateSpec::capture("detail_url", r"/property/([^/?#]+)"),
            ),
            FieldSpec::new("location", LocateSpec::label("p", "Location :")),
            FieldSpec::new("price_php", LocateSpec::label("p", "Price (Php) :")),
            FieldSpec::new(
                "address",
                LocateSpec::Unlabeled {
                    selector: "p".to_string(),
                    labels: strings(&["Location", "Price"]),
                },
            ),
            FieldSpec::new("image_url", LocateSpec::css_with("img", "attr:src"))
                .transform(&absolute),
        ],
        identity: strings(&["id", "property_id", "detail_url"]),
        require_any: Vec::new(),
        limit: ResultLimit::Global,
        stop_on_empty_page: false,
    }
}

/// One Buena Mano property page. Fed with detail pages saved or fetched by URL.
fn bpi_detail() -> SourceSpec {
    let summary = |label: &str| LocateSpec::label(".property-summary p", label);
    let location = |label: &str| LocateSpec::label(".property-location-content p", label);

    SourceSpec {
        id: "bpi_detail".to_string(),
        name: "BPI property detail".to_string(),
        pages: None,
        // The summary and the location panel are siblings; walk up from the title
        locator: boundary(
            None,
            ".property-summary h3",
            Some(".property-location-content"),
        ),
        fields: vec![
            FieldSpec::new("title", LocateSpec::css(".property-summary h3")),
            FieldSpec::new("location", summary("Location :")),
            FieldSpec::new("address", summary("Address:")),
            FieldSpec::new("lot_area_sqm", summary("Lot Area (sqm) :")),
            FieldSpec::new("floor_area_sqm", summary("Floor Area (sqm) :")),
            FieldSpec::new("price_php", summary("Price (Php) :")),
            FieldSpec::new("storeys", summary("Storeys :")),
            FieldSpec::new("bedrooms", summary("Bedrooms :")),
            FieldSpec::new("bathrooms", summary("Bathrooms :")),
            FieldSpec::new("usage_classification", summary("Usage Classification :")),
            FieldSpec::new(
                "property_classification",
                location("Property Classification:"),
            ),
            FieldSpec::new("special_concerns", location("Special Concerns:"))
                .transform("clear_if:-"),
            FieldSpec::new("sales_advisor", location("Sales Advisor :")),
            FieldSpec::new("contact_no", location("Contact No. :")),
            FieldSpec::new("alternate", location("Alternate :")),
            FieldSpec::new("alternate_no", location("Alternate's No. :")),
        ],
        identity: strings(&["title"]),
        require_any: Vec::new(),
        limit: ResultLimit::Unlimited,
        stop_on_empty_page: false,
    }
}

/// BDO listing items. Rows are told apart by their icon.
fn bdo() -> SourceSpec {
    let tagged = |contains: &str, occurrence: usize| LocateSpec::Tagged {
        row: ".item-content--row".to_string(),
        marker: ".item-content--row-icon svg use".to_string(),
        attr: "xlink:href".to_string(),
        contains: contains.to_string(),
        value: ".city".to_string(),
        occurrence,
    };
    let either = |a: LocateSpec, b: LocateSpec| LocateSpec::FirstOf {
        alternatives: vec![a, b],
    };

    SourceSpec {
        id: "bdo".to_string(),
        name: "BDO".to_string(),
        pages: Some(Pages::single(BDO_URL)),
        locator: boundary(Some(".pmu-productListing .item"), ".title", None),
        fields: vec![
            FieldSpec::new("Property_address", LocateSpec::css(".title")),
            FieldSpec::new(
                "Property_short_description",
                either(tagged("location", 0), tagged("map", 0)),
            ),
            FieldSpec::new(
                "Advertised_price",
                either(tagged("tag_outline", 0), tagged("price", 0)),
            ),
            FieldSpec::new(
                "Type",
                either(tagged("home_loan-outline", 0), tagged("home-outline", 0)),
            ),
            FieldSpec::new("Lot_area", tagged("business_building-outline", 1)),
            FieldSpec::new("Floor_area", tagged("business_building-outline", 0)),
            FieldSpec::new("Offer_type", LocateSpec::constant("Negotiated Sale")),
            FieldSpec::new(
                "Additional_information",
                either(
                    LocateSpec::css_with("a[href*='details-page']", "attr:href"),
                    either(tagged("location", 1), tagged("map", 1)),
                ),
            ),
        ],
        identity: strings(&["Additional_information", "Property_address"]),
        require_any: Vec::new(),
        limit: ResultLimit::Global,
        stop_on_empty_page: false,
    }
}

/// EastWest content cards, paginated with `?page=N` until a page comes back empty.
fn eastwest_bank() -> SourceSpec {
    let info = |index: usize| LocateSpec::nth(".content_card-info-text", index);

    SourceSpec {
        id: "eastwest_bank".to_string(),
        name: "Eastwest Bank".to_string(),
        pages: Some(Pages::paginated(EASTWEST_URL)),
        locator: boundary(Some(".content_card"), ".content_card-title", None),
        fields: vec![
            FieldSpec::new("property_name", LocateSpec::css(".content_card-title")),
            FieldSpec::new("property_no", info(0)),
            FieldSpec::new("type", info(1)),
            FieldSpec::new("lot_area", info(2)),
            FieldSpec::new("floor_area", info(3)),
            FieldSpec::new("location", info(4)),
            FieldSpec::new("city", info(5)),
            FieldSpec::new("price", LocateSpec::css(".content_card-price"))
                .transform("replace:PhP=>")
                .transform("strip_chars:,")
                .transform("trim"),
            FieldSpec::new("url", LocateSpec::css_with("a", "attr:href"))
                .transform(&format!("absolute_url:{EASTWEST_URL}"))
                .default(EASTWEST_URL),
        ],
        identity: strings(&["property_no", "url"]),
        require_any: Vec::new(),
        limit: ResultLimit::Unlimited,
        stop_on_empty_page: true,
    }
}

const PNB_COLUMNS: [&str; 9] = [
    "Title_ID",
    "Title/CR No.",
    "Location/Description",
    "Property use",
    "Area",
    "Floor Area",
    "Minimum Price",
    "# of Titles",
    "Status",
];

const PNB_CARRY: [&str; 4] = [
    "Province",
    "City/Municipality",
    "Contact Person",
    "Contact Details",
];

/// PNB PDF tables. Location and contact rows apply to the listings below them.
fn pnb() -> SourceSpec {
    let columns = PNB_COLUMNS
        .iter()
        .map(|name| FieldSpec::new(name, LocateSpec::column(name)).transform("clear_if:-"));
    let carried = PNB_CARRY
        .iter()
        .map(|key| FieldSpec::new(key, LocateSpec::carry(key)));

    SourceSpec {
        id: "pnb".to_string(),
        name: "PNB".to_string(),
        pages: None,
        locator: LocatorSpec::Header {
            keywords: strings(&["Title_ID"]),
            disclaimer_keywords: Vec::new(),
            threshold_percent: default_threshold(),
            min_cells: 1,
            carry_over: Some(CarryOverPolicy::new(&PNB_CARRY)),
        },
        fields: columns.chain(carried).collect(),
        identity: strings(&["Title_ID", "Title/CR No."]),
        require_any: strings(&PNB_COLUMNS),
        limit: ResultLimit::Unlimited,
        stop_on_empty_page: false,
    }
}

const METROBANK_COLUMNS: [&str; 8] = [
    "Property No.",
    "Property Type",
    "Location",
    "Lot Area",
    "Floor Area",
    "Price",
    "Classification",
    "Status",
];

/// Metrobank PDF tables, headers found by keyword.
fn metrobank() -> SourceSpec {
    SourceSpec {
        id: "metrobank".to_string(),
        name: "Metrobank".to_string(),
        pages: None,
        locator: LocatorSpec::Header {
            keywords: strings(&[
                "PROPERTY",
                "LOCATION",
                "PRICE",
                "AREA",
                "DESCRIPTION",
                "TYPE",
                "CLASSIFICATION",
                "STATUS",
            ]),
            disclaimer_keywords: strings(&[
                "disclaimer",
                "as-is",
                "where-is",
                "no recourse",
                "warranties",
                "buybacks",
            ]),
            threshold_percent: default_threshold(),
            min_cells: default_min_cells(),
            carry_over: None,
        },
        fields: METROBANK_COLUMNS
            .iter()
            .map(|name| FieldSpec::new(name, LocateSpec::column(name)).transform("clear_if:-"))
            .collect(),
        identity: strings(&["Property No."]),
        require_any: strings(&METROBANK_COLUMNS),
        limit: ResultLimit::Unlimited,
        stop_on_empty_page: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragment::{Document, Table};

    #[test]
    fn test_builtins_build() {
        for spec in builtin() {
            assert!(spec.build(Some(20)).is_ok(), "{} does not build", spec.id);
        }
    }

    #[test]
    fn test_bpi_results_page() {
        let html = r#"
        <html><body>
          <div class="search-results">
            <div class="result-each">
              <img src="./uploads/5521.jpg">
              <h4><a href="/property/5521">House &amp; Lot (03997-O-247)</a></h4>
              <p>Location : Makati City</p>
              <p>123 Ayala Ave., Brgy. San Lorenzo</p>
              <p>Price (Php) : 4,500,000.00</p>
            </div>
            <div class="result-each">
              <h4><a href="/property/6001">Vacant Lot (10020-B-113)</a></h4>
              <p>Location : Tanauan, Batangas</p>
            </div>
            <div class="result-each">
              <h4><a href="/property/5521">House &amp; Lot (03997-O-247)</a></h4>
            </div>
          </div>
        </body></html>
        "#;
        let pipeline = bpi().build(None).unwrap();
        let report = pipeline.run(vec![Ok(Document::html("bpi.html", html))]);
        let records = &report.records.records;

        assert_eq!(records.len(), 2);
        assert_eq!(report.duplicates, 1);
        assert_eq!(records[0].get("type"), Some("House & Lot"));
        assert_eq!(records[0].get("id"), Some("03997-O-247"));
        assert_eq!(
            records[0].get("detail_url"),
            Some("https://www.buenamano.ph/property/5521")
        );
        assert_eq!(records[0].get("property_id"), Some("5521"));
        assert_eq!(records[0].get("price_php"), Some("4,500,000.00"));
        assert_eq!(
            records[0].get("image_url"),
            Some("https://www.buenamano.ph/uploads/5521.jpg")
        );
        assert_eq!(
            records[0].get("address"),
            Some("123 Ayala Ave., Brgy. San Lorenzo")
        );
        assert_eq!(records[1].get("image_url"), Some("NA"));
        assert_eq!(records[1].get("location"), Some("Tanauan, Batangas"));
        assert_eq!(records[1].get("address"), Some("NA"));
    }

    #[test]
    fn test_bpi_detail_page() {
        let html = r#"
        <html><body><div class="container">
          <div class="property-summary">
            <h3>Townhouse (03997-O-300)</h3>
            <p>Location : Quezon City</p>
            <p>Lot Area (sqm) : 60</p>
            <p>Bedrooms : 3</p>
          </div>
          <div class="property-location-content">
            <p>Property Classification: Green Tag</p>
            <p>Special Concerns: -</p>
            <p>Sales Advisor : Maria Santos</p>
            <p>Alternate's No. : 0917 000 0000</p>
          </div>
        </div></body></html>
        "#;
        let pipeline = bpi_detail().build(None).unwrap();
        let report = pipeline.run(vec![Ok(Document::html("detail.html", html))]);
        let records = &report.records.records;

        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.get("title"), Some("Townhouse (03997-O-300)"));
        assert_eq!(r.get("location"), Some("Quezon City"));
        assert_eq!(r.get("lot_area_sqm"), Some("60"));
        assert_eq!(r.get("bathrooms"), Some("NA"));
        assert_eq!(r.get("property_classification"), Some("Green Tag"));
        assert_eq!(r.get("special_concerns"), Some("NA"));
        assert_eq!(r.get("sales_advisor"), Some("Maria Santos"));
        assert_eq!(r.get("alternate"), Some("NA"));
        assert_eq!(r.get("alternate_no"), Some("0917 000 0000"));
    }

    #[test]
    fn test_bdo_items() {
        let html = r##"
        <div class="pmu-productListing">
          <div class="item">
            <p class="title">Lot 5 Blk 2, Dasmarinas, Cavite</p>
            <div class="item-content--row"><span class="item-content--row-icon"><svg><use xlink:href="#home-outline"></use></svg></span><span class="city">Residential Lot</span></div>
            <div class="item-content--row"><span class="item-content--row-icon"><svg><use xlink:href="#tag_outline"></use></svg></span><span class="city">PHP 1,200,000</span></div>
            <div class="item-content--row"><span class="item-content--row-icon"><svg><use xlink:href="#business_building-outline"></use></svg></span><span class="city">150 sqm</span></div>
            <a href="/assets/details-page?id=77">Details</a>
          </div>
        </div>
        "##;
        let pipeline = bdo().build(None).unwrap();
        let report = pipeline.run(vec![Ok(Document::html("bdo.html", html))]);
        let r = &report.records.records[0];

        assert_eq!(r.get("Property_address"), Some("Lot 5 Blk 2, Dasmarinas, Cavite"));
        assert_eq!(r.get("Type"), Some("Residential Lot"));
        assert_eq!(r.get("Advertised_price"), Some("PHP 1,200,000"));
        assert_eq!(r.get("Floor_area"), Some("150 sqm"));
        assert_eq!(r.get("Lot_area"), Some("NA"));
        assert_eq!(r.get("Offer_type"), Some("Negotiated Sale"));
        assert_eq!(r.get("Additional_information"), Some("/assets/details-page?id=77"));
    }

    #[test]
    fn test_eastwest_card() {
        let html = r#"
        <div class="content_card">
          <a href="/property/ew-1"><h5 class="content_card-title">Condo Unit in Makati</h5></a>
          <span class="content_card-info-text">EW-0001</span>
          <span class="content_card-info-text">Condominium</span>
          <span class="content_card-info-text">-</span>
          <span class="content_card-info-text">32 sqm</span>
          <span class="content_card-info-text">Ayala Ave</span>
          <span class="content_card-info-text">Makati</span>
          <span class="content_card-price">PhP 3,100,000</span>
        </div>
        "#;
        let pipeline = eastwest_bank().build(Some(1)).unwrap();
        let report = pipeline.run(vec![Ok(Document::html("p1", html))]);
        let r = &report.records.records[0];

        assert_eq!(r.get("property_no"), Some("EW-0001"));
        assert_eq!(r.get("city"), Some("Makati"));
        assert_eq!(r.get("price"), Some("3100000"));
        assert_eq!(
            r.get("url"),
            Some("https://pre-owned-properties.eastwestbanker.com/property/ew-1")
        );
    }

    fn table(rows: &[&[&str]]) -> Table {
        rows.iter()
            .map(|row| {
                row.iter()
                    .map(|c| if c.is_empty() { None } else { Some(c.to_string()) })
                    .collect()
            })
            .collect()
    }

    #[test]
    fn test_pnb_tables() {
        let doc = Document::tables(
            "pnb.json",
            vec![table(&[
                &PNB_COLUMNS,
                &["Laguna|Calamba|Juan Cruz|09171234567"],
                &["PNB-001", "T-123", "Lot 1, Brgy. Real", "Residential", "200", "-", "1,500,000", "1", "Available"],
                &["PNB-002", "T-124", "Lot 2, Brgy. Real", "Residential", "180", "-", "1,300,000", "1", "Available"],
                &["-", "-", "-", "-", "-", "-", "-", "-", "-"],
            ])],
        );
        let report = pnb().build(None).unwrap().run(vec![Ok(doc)]);
        let records = &report.records.records;

        assert_eq!(records.len(), 2);
        assert_eq!(report.discarded, 1);
        for r in records {
            assert_eq!(r.get("Province"), Some("Laguna"));
            assert_eq!(r.get("City/Municipality"), Some("Calamba"));
            assert_eq!(r.get("Floor Area"), Some("NA"));
        }
        assert_eq!(records[1].get("Minimum Price"), Some("1,300,000"));
    }

    #[test]
    fn test_pnb_province_only_row() {
        let doc = Document::tables(
            "pnb.json",
            vec![table(&[
                &PNB_COLUMNS,
                &["Laguna", "", "", "", "", "", "", "", ""],
                &["PNB-010", "T-200", "Lot 5, Brgy. Uno", "Residential", "150", "-", "900,000", "1", "Available"],
            ])],
        );
        let report = pnb().build(None).unwrap().run(vec![Ok(doc)]);
        let records = &report.records.records;

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("Title_ID"), Some("PNB-010"));
        assert_eq!(records[0].get("Province"), Some("Laguna"));
        assert_eq!(records[0].get("City/Municipality"), Some("NA"));
    }

    #[test]
    fn test_metrobank_tables() {
        let doc = Document::tables(
            "metrobank.json",
            vec![table(&[
                &["DISCLAIMER: properties are sold on an AS-IS, WHERE-IS basis", ""],
                &METROBANK_COLUMNS,
                &["MB-1", "Residential Lot", "Antipolo, Rizal", "240", "", "2,100,000", "Lot", "Available"],
            ])],
        );
        let report = metrobank().build(None).unwrap().run(vec![Ok(doc)]);
        let records = &report.records.records;

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("Location"), Some("Antipolo, Rizal"));
        assert_eq!(records[0].get("Floor Area"), Some("NA"));
    }
}
