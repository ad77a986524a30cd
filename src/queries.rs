//! GraphQL documents sent to the v4 API.

fn cursor(after: Option<&str>) -> String {
    match after {
        Some(c) => format!("\"{}\"", c),
        None => "null".to_string(),
    }
}

const REPO_FIELDS: &str = r#"
      pageInfo {
        hasNextPage
        endCursor
      }
      nodes {
        nameWithOwner
        stargazers {
          totalCount
        }
        forkCount
        languages(first: 10, orderBy: {field: SIZE, direction: DESC}) {
          edges {
            size
            node {
              name
              color
            }
          }
        }
      }"#;

/// Overview of owned (non-fork) repositories and repositories contributed to,
/// one page of each.
pub fn repos_overview(owned_cursor: Option<&str>, contrib_cursor: Option<&str>) -> String {
    format!(
        r#"{{
  viewer {{
    login,
    name,
    repositories(
      first: 100,
      orderBy: {{ field: UPDATED_AT, direction: DESC }},
      isFork: false,
      after: {owned}
    ) {{{fields}
    }}
    repositoriesContributedTo(
      first: 100,
      includeUserRepositories: false,
      orderBy: {{ field: UPDATED_AT, direction: DESC }},
      contributionTypes: [COMMIT, PULL_REQUEST, REPOSITORY, PULL_REQUEST_REVIEW],
      after: {contrib}
    ) {{{fields}
    }}
  }}
}}"#,
        owned = cursor(owned_cursor),
        contrib = cursor(contrib_cursor),
        fields = REPO_FIELDS,
    )
}

/// Every year the viewer has contributed in
pub fn contrib_years() -> String {
    r#"
query {
  viewer {
    contributionsCollection {
      contributionYears
    }
  }
}
"#
    .to_string()
}

/// Aliased `year<Y>` fragment with the total contributions of one year
pub fn contribs_by_year(year: i32) -> String {
    format!(
        r#"
    year{year}: contributionsCollection(
        from: "{year}-01-01T00:00:00Z",
        to: "{next}-01-01T00:00:00Z"
    ) {{
      contributionCalendar {{
        totalContributions
      }}
    }}
"#,
        year = year,
        next = year + 1,
    )
}

pub fn all_contribs(years: &[i32]) -> String {
    let by_years: Vec<String> = years.iter().map(|y| contribs_by_year(*y)).collect();
    format!(
        r#"
query {{
  viewer {{
    {}
  }}
}}
"#,
        by_years.join("\n")
    )
}

/// Daily contribution calendar for one year
pub fn daily_contributions(year: i32) -> String {
    format!(
        r#"
query {{
  viewer {{
    contributionsCollection(
      from: "{year}-01-01T00:00:00Z",
      to: "{next}-01-01T00:00:00Z"
    ) {{
      contributionCalendar {{
        weeks {{
          contributionDays {{
            date
            contributionCount
          }}
        }}
      }}
    }}
  }}
}}
"#,
        year = year,
        next = year + 1,
    )
}
