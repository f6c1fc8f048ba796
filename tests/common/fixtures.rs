//! Index and summary fixtures served by the mock object store

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Index listing three valid summaries, one truncated upload and a stray file
pub const RINDEX: &str = "\
2020-12-01 00:00:00        820 rsummary/SRR001.psummary
2020-12-01 00:00:00        611 rsummary/SRR002.psummary
2020-12-01 00:00:00         96 rsummary/SRR003.psummary
2020-12-01 00:00:00       1204 rsummary/SRR004.psummary
2020-12-01 00:00:00       4096 rsummary/README.txt
";

/// Summary with one family, one phylum and one sequence entry
pub const SRR001: &str = "\
sra=SRR001;score=88;pctid=91;alns=40;avgcols=150;depth=4.1;fam=pisu.Picorna-7;famcvg=_oO_\r
sra=SRR001;score=88;pctid=91;alns=40;avgcols=150;depth=4.1;phy=pisu;phycvg=_oO_\r
sra=SRR001;score=70;pctid=85;alns=12;avgcols=140;depth=1.2;vir=pisu.Picorna-7.Enterovirus:MN123.1;vircvg=__o_\r
";

/// Summary with a single phylum entry
pub const SRR002: &str = "sra=SRR002;score=50;pctid=77;alns=8;avgcols=99;depth=0.5;phy=nega;phycvg=o___\n";

/// Mount a 200 response with `body` at `/<key>`
pub async fn serve(server: &MockServer, key: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/{}", key)))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

/// Mount the rindex fixture with SRR001 and SRR002; SRR004 is not served
pub async fn serve_rindex(server: &MockServer) {
    serve(server, "rindex.tsv", RINDEX).await;
    serve(server, "rsummary/SRR001.psummary", SRR001).await;
    serve(server, "rsummary/SRR002.psummary", SRR002).await;
}
