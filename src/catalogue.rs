//! The built-in merge-tag catalogues.
//!
//! Every tree here is assembled by plain constructor functions and is never
//! mutated once built. Keys are stable identifiers; names are what the user
//! sees in the suggestion list.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::{MergeNode, MergeTags, Rule, Rules, Tag, TagGroup};

/// Which set of merge tags a template can use.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CatalogueKind {
    /// Organisation, customer, site, job and item tags.
    Base,
    /// Run and driver tags, for templates sent while a delivery run is under way.
    Run,
    /// Proof-of-delivery tags, including fulfilled and adjusted items.
    Pod,
}

impl CatalogueKind {
    pub fn merge_tags(self) -> MergeTags {
        match self {
            CatalogueKind::Base => base_merge_tags(),
            CatalogueKind::Run => on_run_merge_tags(),
            CatalogueKind::Pod => pod_merge_tags(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CatalogueKind::Base => "base",
            CatalogueKind::Run => "run",
            CatalogueKind::Pod => "pod",
        }
    }
}

impl fmt::Display for CatalogueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Layers catalogues in order. A later catalogue replaces top-level entries
/// with the same key, so `[Base, Pod]` swaps in the POD item list.
pub fn compose(kinds: &[CatalogueKind]) -> MergeTags {
    let mut merge_tags = MergeTags::new();
    for kind in kinds {
        let layer = kind.merge_tags();
        tracing::debug!(catalogue = %kind, entries = layer.len(), "layering catalogue");
        merge_tags.merge(layer);
    }
    merge_tags
}

pub fn base_merge_tags() -> MergeTags {
    let mut customer = org_contact_tags("customer", "Customer");
    customer.insert(
        "customerAccountsEmail",
        Tag::new(
            "Accounts Email",
            "{{ customer.accountsEmail }}",
            "customer.accounts@example.com",
        ),
    );
    customer.insert(
        "customerAccountNumber",
        Tag::new("Account Number", "{{ customer.accountNumber }}", "ACC-NUM-1"),
    );
    customer.insert(
        "customerSecondaryAccountNumber",
        Tag::new(
            "Secondary Account Number",
            "{{ customer.secondaryAccountNumber }}",
            "SEC-ACC-NUM-1",
        ),
    );

    let mut site = org_contact_tags("site", "Site");
    site.insert(
        "siteContact",
        Tag::new("Contact", "{{ site.contact }}", "Example Site Contact"),
    );

    let job: MergeTags = [
        (
            "templateName",
            MergeNode::from(Tag::new("Template Name", "{{ job.template.name }}", "Delivery")),
        ),
        (
            "customerPO",
            Tag::new("Customer PO", "{{ job.customerPO }}", "PO-123").into(),
        ),
        (
            "dueByStart",
            TagGroup::new("Due By Start", datetime_tags("job.dueByStart")).into(),
        ),
        (
            "dueByEnd",
            TagGroup::new("Due By End", datetime_tags("job.dueByEnd")).into(),
        ),
        (
            "jobTotalPrice",
            Tag::new("Total Price", "{{ job.totalPrice }}", "39.99").into(),
        ),
        (
            "jobTotalItems",
            Tag::new("Total Items", "{{ job.itemCount }}", "5").into(),
        ),
        (
            "jobInstructions",
            Tag::new(
                "Instructions",
                "{{ job.instructions }}",
                "Go round the back.\n\nCall if no answer.",
            )
            .into(),
        ),
    ]
    .into_iter()
    .collect();

    [
        ("account", TagGroup::new("Account", org_contact_tags("account", "Account"))),
        ("branding", TagGroup::new("Branding", org_contact_tags("branding", "Branding"))),
        ("depot", TagGroup::new("Depot", org_contact_tags("depot", "Depot"))),
        ("customer", TagGroup::new("Customer", customer)),
        ("site", TagGroup::new("Site", site)),
        ("job", TagGroup::new("Job", job)),
        (
            "items",
            TagGroup::new("Items", item_tags("item", false))
                .with_rules(loop_rules("Repeat for each item", "item", "job.items")),
        ),
    ]
    .into_iter()
    .collect()
}

pub fn on_run_merge_tags() -> MergeTags {
    let run: MergeTags = [
        ("etaStart", MergeNode::from(TagGroup::new("ETA Start", datetime_tags("job.etaStart")))),
        ("etaEnd", TagGroup::new("ETA End", datetime_tags("job.etaEnd")).into()),
        ("runPosition", Tag::new("Position On Run", "{{ run.position }}", "2").into()),
        (
            "runPositionOrdinal",
            Tag::new("Position On Run (ordinal)", "{{ run.positionOrdinal }}", "2nd").into(),
        ),
    ]
    .into_iter()
    .collect();

    let driver: MergeTags = [
        ("driverFirstName", Tag::new("First Name", "{{ run.driver.firstName }}", "Example")),
        ("driverLastName", Tag::new("Last Name", "{{ run.driver.lastName }}", "Driver")),
        ("driverPhone", Tag::new("Phone", "{{ run.driver.phone }}", "07987654321")),
    ]
    .into_iter()
    .collect();

    [
        ("run", TagGroup::new("Run", run)),
        ("driver", TagGroup::new("Driver", driver)),
    ]
    .into_iter()
    .collect()
}

pub fn pod_merge_tags() -> MergeTags {
    let pod: MergeTags = [(
        "completedAt",
        TagGroup::new("Completed At", datetime_tags("pod.completedAt")),
    )]
    .into_iter()
    .collect();

    let mut adjusted = item_tags("adjustedItem", true);
    adjusted.insert(
        "adjustmentCode",
        Tag::new("Adjustment Code", "{{ item.adjustmentCode.code }}", "ADJ-CODE-REJ"),
    );
    adjusted.insert(
        "adjustmentCodeDescription",
        Tag::new(
            "Adjustment Code Description",
            "{{ item.adjustmentCode.description }}",
            "Rejected at Site",
        ),
    );

    [
        ("pod", TagGroup::new("POD", pod)),
        (
            "items",
            TagGroup::new("Items", item_tags("item", true))
                .with_rules(loop_rules("Repeat for each item", "item", "job.items")),
        ),
        (
            "adjustedItems",
            TagGroup::new("Adjusted Items", adjusted).with_rules(loop_rules(
                "Repeat for each item",
                "adjustedItem",
                "pod.adjustedItems",
            )),
        ),
    ]
    .into_iter()
    .collect()
}

/// A single `for` loop rule keyed `<declared>Repeat`.
pub fn loop_rules(name: &str, declared: &str, source: &str) -> Rules {
    [(
        format!("{declared}Repeat"),
        Rule {
            name: name.to_string(),
            before: format!("{{% for {declared} in {source} %}}"),
            after: "{% endfor %}".to_string(),
        },
    )]
    .into_iter()
    .collect()
}

pub fn org_contact_tags(qualifier: &str, name: &str) -> MergeTags {
    [
        (
            format!("{qualifier}Name"),
            MergeNode::from(Tag::new(
                "Name",
                format!("{{{{ {qualifier}.name }}}}"),
                format!("Example {name}"),
            )),
        ),
        (
            format!("{qualifier}Email"),
            Tag::new(
                "Email",
                format!("{{{{ {qualifier}.email }}}}"),
                format!("example@{}.com", name.to_lowercase()),
            )
            .into(),
        ),
        (
            format!("{qualifier}Phone"),
            Tag::new("Phone", format!("{{{{ {qualifier}.phone }}}}"), "0131 123 4567").into(),
        ),
        (
            format!("{qualifier}Address"),
            TagGroup::new("Address", address_tags(qualifier, name)).into(),
        ),
    ]
    .into_iter()
    .collect()
}

pub fn address_tags(qualifier: &str, name: &str) -> MergeTags {
    [
        (
            format!("{qualifier}Address"),
            Tag::new(
                "Full Address",
                format!("{{{{ {qualifier}.address }}}}"),
                format!("1 {name} Park\n{name} Road\n{name}ton\nEH1 1AA"),
            ),
        ),
        (
            format!("{qualifier}Address1"),
            Tag::new(
                "Address 1",
                format!("{{{{ {qualifier}.address1 }}}}"),
                format!("{name} House"),
            ),
        ),
        (
            format!("{qualifier}Address2"),
            Tag::new(
                "Address 2",
                format!("{{{{ {qualifier}.address2 }}}}"),
                format!("{name} Park"),
            ),
        ),
        (
            format!("{qualifier}Address3"),
            Tag::new(
                "Address 3",
                format!("{{{{ {qualifier}.address3 }}}}"),
                format!("{name} Road"),
            ),
        ),
        (
            format!("{qualifier}City"),
            Tag::new("City", format!("{{{{ {qualifier}.city }}}}"), format!("{name}ton")),
        ),
        (
            format!("{qualifier}Region"),
            Tag::new(
                "Region",
                format!("{{{{ {qualifier}.region }}}}"),
                format!("{name}shire"),
            ),
        ),
        (
            format!("{qualifier}Postcode"),
            Tag::new("Postcode", format!("{{{{ {qualifier}.postcode }}}}"), "EH1 1AA"),
        ),
    ]
    .into_iter()
    .collect()
}

/// Date and time renderings of a timestamp field such as `job.dueByStart`.
pub fn datetime_tags(qualifier: &str) -> MergeTags {
    let leaf = |key: &str, name: &str, field: &str, sample: &str| {
        (
            format!("{qualifier}{key}"),
            Tag::new(name, format!("{{{{ {qualifier}.{field} }}}}"), sample),
        )
    };

    let day: MergeTags = [
        leaf("DayNumber", "Number", "dayNumber", "31"),
        leaf("DayOrdinal", "Ordinal", "dayOrdinal", "31st"),
        leaf("WeekdayLong", "Day of the Week (full)", "weekdayLong", "Monday"),
        leaf("WeekdayShort", "Day of the Week (abbrev)", "weekdayShort", "Mon"),
    ]
    .into_iter()
    .collect();

    let month: MergeTags = [
        leaf("MonthNumber", "Number", "monthNumber", "12"),
        leaf("MonthNameLong", "Name (full)", "monthNameLong", "December"),
        leaf("MonthNameShort", "Name (abbrev)", "monthNameShort", "Dec"),
    ]
    .into_iter()
    .collect();

    let year: MergeTags = [
        leaf("Year2", "2 Digits", "year2", "20"),
        leaf("Year4", "4 Digits", "year4", "2020"),
    ]
    .into_iter()
    .collect();

    let mut date = MergeTags::new();
    let (key, tag) = leaf("DateDMY", "DD/MM/YYYY", "dateDMY", "31/12/2020");
    date.insert(key, tag);
    let (key, tag) = leaf("DateMDY", "MM/DD/YYYY", "dateMDY", "12/31/2020");
    date.insert(key, tag);
    date.insert(format!("{qualifier}Day"), TagGroup::new("Day", day));
    date.insert(format!("{qualifier}Month"), TagGroup::new("Month", month));
    date.insert(format!("{qualifier}Year"), TagGroup::new("Year", year));

    let time: MergeTags = [
        leaf("Time24", "24 Hour", "time24", "14:30"),
        leaf("Time12", "12 Hour", "time12", "2:30"),
        leaf("AmPm", "AM/PM", "amPm", "pm"),
    ]
    .into_iter()
    .collect();

    [
        (format!("{qualifier}Date"), TagGroup::new("Date", date)),
        (format!("{qualifier}Time"), TagGroup::new("Time", time)),
    ]
    .into_iter()
    .collect()
}

/// Per-item tags. Every item tag reads from the loop variable `item`; the
/// qualifier only namespaces the keys.
pub fn item_tags(qualifier: &str, include_fulfilled: bool) -> MergeTags {
    let mut tags = MergeTags::new();
    tags.insert(
        format!("{qualifier}Product"),
        Tag::new("Product", "{{ item.product }}", "Example Product"),
    );
    tags.insert(
        format!("{qualifier}MerchGroup"),
        Tag::new("Merch Group", "{{ item.merchGroup }}", "Example Merch Group"),
    );
    tags.insert(
        format!("{qualifier}QuantityOrdered"),
        Tag::new("Quantity Ordered", "{{ item.qtyOrdered }}", "5"),
    );
    if include_fulfilled {
        tags.insert(
            format!("{qualifier}QuantityFulfilled"),
            Tag::new("Quantity Fulfilled", "{{ item.qtyFulfilled }}", "4"),
        );
    }
    tags.insert(
        format!("{qualifier}UnitPrice"),
        Tag::new("Unit Price", "{{ item.unitPrice }}", "12.99"),
    );
    tags.insert(
        format!("{qualifier}TotalPrice"),
        Tag::new("Total Price", "{{ item.totalPrice }}", "64.95"),
    );
    tags.insert(
        format!("{qualifier}UnitWeight"),
        Tag::new("Unit Weight", "{{ item.unitWeight }}", "15.5"),
    );
    tags.insert(
        format!("{qualifier}TotalWeight"),
        Tag::new("Total Weight", "{{ item.totalWeight }}", "77.5"),
    );
    tags
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::token_path;
    use crate::tags::{extract_sample_values, flatten, flatten_rules, validate};
    use pretty_assertions::assert_eq;

    #[test]
    fn builtin_catalogues_are_valid() {
        for kinds in [
            vec![CatalogueKind::Base],
            vec![CatalogueKind::Run],
            vec![CatalogueKind::Pod],
            vec![CatalogueKind::Base, CatalogueKind::Run, CatalogueKind::Pod],
        ] {
            assert_eq!(validate(&compose(&kinds)), Ok(()), "catalogues {kinds:?}");
        }
    }

    #[test]
    fn base_top_level_order() {
        let keys: Vec<String> = base_merge_tags().keys().map(str::to_string).collect();
        assert_eq!(
            keys,
            vec!["account", "branding", "depot", "customer", "site", "job", "items"]
        );
    }

    #[test]
    fn org_contact_address_nests_under_group() {
        let flat = flatten(&base_merge_tags(), &[]);
        let full = flat
            .iter()
            .find(|tag| tag.value == "{{ depot.address }}")
            .unwrap();
        assert_eq!(full.name, "Full Address");
        assert_eq!(full.breadcrumbs, vec!["Depot".to_string(), "Address".to_string()]);
        assert_eq!(full.sample, "1 Depot Park\nDepot Road\nDepotton\nEH1 1AA");
    }

    #[test]
    fn datetime_tags_use_qualified_paths() {
        let flat = flatten(&datetime_tags("job.dueByStart"), &[]);
        assert_eq!(flat.len(), 14);
        let weekday = flat
            .iter()
            .find(|tag| tag.key == "job.dueByStartWeekdayShort")
            .unwrap();
        assert_eq!(weekday.value, "{{ job.dueByStart.weekdayShort }}");
        assert_eq!(weekday.breadcrumbs, vec!["Date".to_string(), "Day".to_string()]);
    }

    #[test]
    fn fulfilled_quantity_only_in_pod() {
        let has_fulfilled = |tags: &MergeTags| {
            flatten(tags, &[])
                .iter()
                .any(|tag| tag.value == "{{ item.qtyFulfilled }}")
        };
        assert!(!has_fulfilled(&base_merge_tags()));
        assert!(has_fulfilled(&pod_merge_tags()));
    }

    #[test]
    fn compose_replaces_items_in_place() {
        let composed = compose(&[CatalogueKind::Base, CatalogueKind::Pod]);
        let keys: Vec<&str> = composed.keys().collect();
        assert_eq!(
            keys,
            vec!["account", "branding", "depot", "customer", "site", "job", "items", "pod", "adjustedItems"]
        );
        let samples = extract_sample_values(&composed);
        assert_eq!(samples.get("itemQuantityFulfilled").map(String::as_str), Some("4"));
    }

    #[test]
    fn loop_rules_wrap_items() {
        let rules = flatten_rules(&pod_merge_tags());
        let summary: Vec<(&str, &str)> = rules
            .iter()
            .map(|rule| (rule.key.as_str(), rule.before.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("itemRepeat", "{% for item in job.items %}"),
                ("adjustedItemRepeat", "{% for adjustedItem in pod.adjustedItems %}"),
            ]
        );
        assert!(rules.iter().all(|rule| rule.after == "{% endfor %}"));
    }

    #[test]
    fn every_token_has_a_path() {
        let all = compose(&[CatalogueKind::Base, CatalogueKind::Run, CatalogueKind::Pod]);
        for tag in flatten(&all, &[]) {
            assert!(token_path(&tag.value).is_some(), "{}", tag.value);
        }
    }

    #[test]
    fn kind_displays_config_name() {
        assert_eq!(CatalogueKind::Pod.to_string(), "pod");
        let config: Vec<CatalogueKind> = serde_json::from_str(r#"["base", "run"]"#).unwrap();
        assert_eq!(config, vec![CatalogueKind::Base, CatalogueKind::Run]);
    }
}
