use ipnet::IpNet;

/// Attribute values recovered from one whois block. A missing field is
/// `None`, never an empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedFields {
    pub netname: Option<String>,
    pub description: Option<String>,
    pub country: Option<String>,
    pub maintained_by: Option<String>,
    pub created: Option<String>,
    pub last_modified: Option<String>,
    pub status: Option<String>,
    pub source: Option<String>,
}

/// One row as persisted: a single network prefix plus the block's other
/// attributes. A block covering K prefixes produces K records sharing all
/// non-prefix fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationRecord {
    pub inetnum: IpNet,
    pub netname: Option<String>,
    pub description: Option<String>,
    pub country: Option<String>,
    pub maintained_by: Option<String>,
    pub created: Option<String>,
    pub last_modified: Option<String>,
    pub status: Option<String>,
    pub source: Option<String>,
}

impl AllocationRecord {
    /// Fan one set of extracted fields out into one record per prefix.
    pub fn expand(fields: ExtractedFields, prefixes: Vec<IpNet>) -> Vec<AllocationRecord> {
        prefixes
            .into_iter()
            .map(|inetnum| AllocationRecord {
                inetnum,
                netname: fields.netname.clone(),
                description: fields.description.clone(),
                country: fields.country.clone(),
                maintained_by: fields.maintained_by.clone(),
                created: fields.created.clone(),
                last_modified: fields.last_modified.clone(),
                status: fields.status.clone(),
                source: fields.source.clone(),
            })
            .collect()
    }
}
